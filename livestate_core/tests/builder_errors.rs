use livestate_core::DeltaEngine;
use livestate_core::error::BuildError;
use livestate_core::mocks::ScriptedSnapshots;
use rstest::rstest;

#[rstest]
fn builder_missing_source_yields_typed_build_error() {
    let err = DeltaEngine::<ScriptedSnapshots>::builder()
        // missing with_source()
        .try_build()
        .expect_err("should fail with MissingSource");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingSource) => {}
        other => panic!("expected MissingSource, got: {other:?}"),
    }
}
