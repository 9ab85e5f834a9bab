use casework::{InitTracingError, VerbosityLevel, setup_tracing};

#[test]
fn tracing_is_installed_once() {
    let guard = setup_tracing(VerbosityLevel::ExtraVerbose);
    assert!(guard.is_ok());

    let again = setup_tracing(VerbosityLevel::Verbose);
    assert!(matches!(
        again,
        Err(InitTracingError::AlreadyInitialized(_))
    ));
}
