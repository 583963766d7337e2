//! Tests for the compile/post-process pipeline against fake tools.

use std::time::Duration;

use standalone_sass::compiler::{Pipeline, PipelineError, PipelineEvent, StageKind};

use crate::common::{
    LogCapture, Project, POSTCSS_FAIL, POSTCSS_OK, SASS_FAIL, SASS_OK, SASS_SILENT_CRASH,
};

const SILENT_EXIT_WARNING: &str = "Stage exited unsuccessfully without reporting an error";

async fn drain(pipeline: &mut Pipeline) -> Vec<PipelineEvent> {
    tokio::time::timeout(Duration::from_secs(10), async {
        let mut events = Vec::new();
        while let Some(event) = pipeline.next_event().await {
            events.push(event);
        }
        events
    })
    .await
    .expect("pipeline should finish")
}

fn outcomes(events: &[PipelineEvent]) -> Vec<&PipelineEvent> {
    events
        .iter()
        .filter(|e| !matches!(e, PipelineEvent::Changed { .. }))
        .collect()
}

#[cfg(unix)]
#[tokio::test]
async fn test_compile_only_success() {
    let project = Project::new();
    project.tool("node-sass", SASS_OK);
    let mut pipeline = Pipeline::new(project.commands(project.config(false)));

    pipeline.start_run(false).unwrap();
    let events = drain(&mut pipeline).await;

    let outcomes = outcomes(&events);
    assert_eq!(outcomes.len(), 1);
    match outcomes[0] {
        PipelineEvent::Succeeded { stage, text } => {
            assert_eq!(stage.kind, StageKind::Compile);
            assert!(text.is_empty());
        }
        other => panic!("Expected Succeeded, got {other:?}"),
    }
    assert!(project.output().exists());
    assert_eq!(pipeline.running_stages(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_compile_success_hands_off_to_post_processor() {
    let project = Project::new();
    project.tool("node-sass", SASS_OK).tool("postcss", POSTCSS_OK);
    let mut pipeline = Pipeline::new(project.commands(project.config(true)));

    pipeline.start_run(false).unwrap();
    let events = drain(&mut pipeline).await;

    let outcomes = outcomes(&events);
    assert_eq!(outcomes.len(), 1, "only the final stage completes the run");
    assert!(matches!(
        outcomes[0],
        PipelineEvent::Succeeded { stage, .. } if stage.kind == StageKind::PostProcess
    ));
    assert_eq!(
        std::fs::read_to_string(project.output()).unwrap(),
        "body { color: red; }"
    );
    assert!(!project.intermediate().exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_compile_error_stops_before_post_processor() {
    let project = Project::new();
    project.tool("node-sass", SASS_FAIL).tool("postcss", POSTCSS_OK);
    let mut pipeline = Pipeline::new(project.commands(project.config(true)));

    pipeline.start_run(false).unwrap();
    let events = drain(&mut pipeline).await;

    let outcomes = outcomes(&events);
    assert_eq!(outcomes.len(), 1);
    match outcomes[0] {
        PipelineEvent::Failed { stage, text } => {
            assert_eq!(stage.kind, StageKind::Compile);
            assert!(text.contains("bad syntax"));
        }
        other => panic!("Expected Failed, got {other:?}"),
    }
    assert!(!project.output().exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_post_processor_failure_still_removes_intermediate() {
    let project = Project::new();
    project.tool("node-sass", SASS_OK).tool("postcss", POSTCSS_FAIL);
    let mut pipeline = Pipeline::new(project.commands(project.config(true)));

    pipeline.start_run(false).unwrap();
    let events = drain(&mut pipeline).await;

    let outcomes = outcomes(&events);
    assert!(matches!(
        outcomes.as_slice(),
        [PipelineEvent::Failed { stage, .. }] if stage.kind == StageKind::PostProcess
    ));
    assert!(!project.intermediate().exists());
    assert!(!project.output().exists());
}

#[tokio::test]
async fn test_missing_compiler_fails_to_start() {
    let project = Project::new();
    let mut pipeline = Pipeline::new(project.commands(project.config(false)));

    let err = pipeline.start_run(false).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Spawn {
            kind: StageKind::Compile,
            ..
        }
    ));
    assert!(pipeline.next_event().await.is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn test_shutdown_removes_intermediate() {
    let project = Project::new();
    project.tool("node-sass", "exec sleep 30");
    std::fs::write(project.intermediate(), "stale").unwrap();
    let mut pipeline = Pipeline::new(project.commands(project.config(true)));

    pipeline.start_run(true).unwrap();
    tokio::time::timeout(Duration::from_secs(10), pipeline.shutdown())
        .await
        .expect("shutdown should finish");

    assert_eq!(pipeline.running_stages(), 0);
    assert!(!project.intermediate().exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_missing_post_processor_fails_and_removes_intermediate() {
    let project = Project::new();
    project.tool("node-sass", SASS_OK);
    let mut pipeline = Pipeline::new(project.commands(project.config(true)));

    pipeline.start_run(false).unwrap();
    let events = drain(&mut pipeline).await;

    let outcomes = outcomes(&events);
    match outcomes.as_slice() {
        [PipelineEvent::Failed { stage, text }] => {
            assert_eq!(stage.kind, StageKind::PostProcess);
            assert!(text.contains("postcss"), "unexpected text: {text}");
        }
        other => panic!("Expected a single post-process failure, got {other:?}"),
    }
    assert!(!project.intermediate().exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_silent_non_zero_exit_is_logged() {
    let logs = LogCapture::default();
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let project = Project::new();
    project.tool("node-sass", SASS_SILENT_CRASH);
    let mut pipeline = Pipeline::new(project.commands(project.config(false)));

    pipeline.start_run(false).unwrap();
    let events = drain(&mut pipeline).await;

    assert!(outcomes(&events).is_empty());
    assert!(
        logs.contents().contains(SILENT_EXIT_WARNING),
        "missing warning in:\n{}",
        logs.contents()
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_reported_failure_is_not_logged_as_silent() {
    let logs = LogCapture::default();
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let project = Project::new();
    project.tool("node-sass", SASS_FAIL);
    let mut pipeline = Pipeline::new(project.commands(project.config(false)));

    pipeline.start_run(false).unwrap();
    drain(&mut pipeline).await;

    assert!(logs.contents().contains("Stage exited"));
    assert!(!logs.contents().contains(SILENT_EXIT_WARNING));
}
