use hotcidr_core::errors::{ExError, ExErrorKind, HotCidrError};
use hotcidr_core::ConnectorError;
use hotcidr_core_types::{RunId, TraceId};

#[test]
fn test_invalid_direction_verifiable_by_kind() {
    let err = HotCidrError::InvalidDirection {
        group: "web".to_string(),
        direction: "sideways".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::InvalidDirection);
    assert_eq!(ex_err.code(), "ERR_INVALID_DIRECTION");
    assert_eq!(ex_err.group(), Some("web"));
}

#[test]
fn test_unsupported_parameter_distinct_from_connector_failure() {
    let unsupported: ExError = ConnectorError::UnsupportedParameter {
        parameter: "src_group_id".to_string(),
    }
    .into_domain("authorize_ingress")
    .into();
    let provider: ExError = ConnectorError::provider("Throttling", "rate exceeded")
        .into_domain("authorize_ingress")
        .into();

    assert_eq!(unsupported.kind(), ExErrorKind::UnsupportedParameter);
    assert_eq!(provider.kind(), ExErrorKind::ExternalService);
    assert_eq!(provider.op(), Some("authorize_ingress"));
    assert!(provider.message().contains("Throttling"));
}

#[test]
fn test_duplicate_record_carries_key() {
    let err = HotCidrError::DuplicateRecord {
        kind: "group".to_string(),
        key: "web".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::DuplicateRecord);
    assert_eq!(ex_err.entity_id(), Some("web"));
    assert!(ex_err.message().contains("group"));
}

#[test]
fn test_error_kind_code_mapping() {
    let kinds = vec![
        (ExErrorKind::InvalidInput, "ERR_INVALID_INPUT"),
        (ExErrorKind::InvalidDirection, "ERR_INVALID_DIRECTION"),
        (ExErrorKind::InvalidRule, "ERR_INVALID_RULE"),
        (ExErrorKind::DuplicateRecord, "ERR_DUPLICATE_RECORD"),
        (ExErrorKind::InvalidSnapshot, "ERR_INVALID_SNAPSHOT"),
        (ExErrorKind::NotFound, "ERR_NOT_FOUND"),
        (ExErrorKind::UnsupportedParameter, "ERR_UNSUPPORTED_PARAMETER"),
        (ExErrorKind::ExternalService, "ERR_EXTERNAL_SERVICE"),
        (ExErrorKind::Io, "ERR_IO"),
        (ExErrorKind::Serialization, "ERR_SERIALIZATION"),
        (ExErrorKind::Internal, "ERR_INTERNAL"),
    ];

    for (kind, expected_code) in kinds {
        assert_eq!(kind.code(), expected_code);
    }
}

#[test]
fn test_builder_context_round_trip() {
    let run_id = RunId::new();
    let ex_err = ExError::new(ExErrorKind::Io)
        .with_op("load_snapshot")
        .with_entity_id("state/boxes.yaml")
        .with_run_id(run_id.clone())
        .with_message("permission denied");

    assert_eq!(ex_err.op(), Some("load_snapshot"));
    assert_eq!(ex_err.entity_id(), Some("state/boxes.yaml"));
    assert_eq!(ex_err.run_id(), Some(&run_id));
    assert_eq!(
        ex_err.to_string(),
        "[ERR_IO] in operation 'load_snapshot': permission denied (entity_id: state/boxes.yaml)"
    );
}

#[test]
fn test_display_includes_trace_id() {
    let ex_err = ExError::new(ExErrorKind::ExternalService)
        .with_op("create_security_group")
        .with_message("Throttling: slow down")
        .with_trace_id("ci-build-42".parse::<TraceId>().unwrap());

    assert_eq!(
        ex_err.to_string(),
        "[ERR_EXTERNAL_SERVICE] in operation 'create_security_group': Throttling: slow down (trace_id: ci-build-42)"
    );
}
