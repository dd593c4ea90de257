//! Unit tests for error handling
//!
//! Tests error types, conversions, and error message formatting.

#[cfg(test)]
mod tests {
    use std::io;

    use crate::errors::RagDeskError;

    // ====== Error Type Tests ======

    #[test]
    fn test_missing_input_message() {
        let error = RagDeskError::MissingInput;
        assert_eq!(error.to_string(), "Missing \"query\" in request body");
    }

    #[test]
    fn test_upstream_wraps_phase_and_source() {
        let source = RagDeskError::EmbeddingFailure("model overloaded".to_string());
        let error = RagDeskError::upstream("embed", &source);

        assert!(matches!(
            error,
            RagDeskError::UpstreamFailure { phase: "embed", .. }
        ));
        let display = error.to_string();
        assert!(display.contains("embed"));
        assert!(display.contains("model overloaded"));
    }

    // ====== Error Conversion Tests ======

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let err: RagDeskError = io_err.into();

        assert!(matches!(err, RagDeskError::Io(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let parse_result: Result<serde_json::Value, _> = serde_json::from_str("{invalid json}");

        if let Err(json_err) = parse_result {
            let err: RagDeskError = json_err.into();
            assert!(matches!(err, RagDeskError::Serialization(_)));
        }
    }

    #[test]
    fn test_error_debug_format() {
        let error = RagDeskError::NotFound("interaction 7".to_string());
        let debug = format!("{error:?}");
        assert!(debug.contains("NotFound"));
    }
}
