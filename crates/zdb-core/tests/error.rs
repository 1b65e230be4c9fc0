//! Tests for error handling

use zdb_core::eval::SandboxError;
use zdb_core::{ZdbError, ZdbResult};

#[test]
fn test_truncated_display()
{
    let error = ZdbError::Truncated { offset: 12, needed: 4 };
    let message = format!("{}", error);
    assert!(message.contains("Truncated"));
    assert!(message.contains("offset 12"));
    assert!(message.contains("4 byte(s)"));
}

#[test]
fn test_unsupported_version_display()
{
    let error = ZdbError::UnsupportedVersion { found: 7, expected: 1 };
    let message = format!("{}", error);
    assert!(message.contains("version 7"));
    assert!(message.contains("expected 1"));
}

#[test]
fn test_parse_error_display()
{
    let error = ZdbError::Parse {
        message: "Expected ')'".to_string(),
        position: 5,
    };
    let message = format!("{}", error);
    assert!(message.contains("column 5"));
    assert!(message.contains("Expected ')'"));
}

#[test]
fn test_resolution_errors_name_the_identifier()
{
    assert_eq!(ZdbError::UnknownVariable("hp".to_string()).to_string(), "Unknown variable: hp");
    assert_eq!(ZdbError::UnknownMember("mana".to_string()).to_string(), "Member not found: mana");
    assert_eq!(
        ZdbError::AmbiguousCall("g".to_string()).to_string(),
        "Ambiguous function call 'g'. Multiple overloads match."
    );
    assert!(ZdbError::NoMatchingFunction("spawn".to_string())
        .to_string()
        .contains("spawn"));
}

#[test]
fn test_type_mismatch_is_verbatim()
{
    let error = ZdbError::TypeMismatch("Indexing applied to non-array type".to_string());
    assert_eq!(error.to_string(), "Indexing applied to non-array type");
}

#[test]
fn test_sandbox_error_conversion()
{
    let error: ZdbError = SandboxError::BlockingCall.into();
    match error {
        ZdbError::Sandbox(SandboxError::BlockingCall) => {}
        other => panic!("Expected Sandbox variant, got {other:?}"),
    }

    let error: ZdbError = SandboxError::Failed("no running program".to_string()).into();
    assert_eq!(error.to_string(), "no running program");
}

#[test]
fn test_io_error_conversion()
{
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.zdbg");
    let error: ZdbError = io.into();
    let message = format!("{}", error);
    assert!(message.contains("IO error"));
    assert!(message.contains("missing.zdbg"));
}

#[test]
fn test_result_type()
{
    let _result: ZdbResult<()> = Ok(());
    let _error_result: ZdbResult<()> = Err(ZdbError::DivideByZero);
}
