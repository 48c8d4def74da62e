//! Integration tests for the idea-to-plan workflow
//!
//! These drive a Session the way the TUI runner does - submit, call the
//! gateway, fold the outcome back in - against a scripted gateway.

use std::sync::Arc;

use popcorn::domain::{ExecutorType, ResultKind, TaskDraft, TaskStatus};
use popcorn::gateway::{GatewayError, ImageConfig, ImageReference, MockPlanGateway, PlanGateway};
use popcorn::session::{ExecutionMode, ExecutionOutcome, Phase, Session, SessionError};

fn bakery_drafts() -> Vec<TaskDraft> {
    [
        ("scout location", ExecutorType::Human, "Visit three candidate sites"),
        ("name the bakery", ExecutorType::Ai, "Propose ten bakery names"),
        ("write tagline", ExecutorType::Ai, "Write a warm one-line tagline"),
        ("design logo", ExecutorType::Ai, "A minimal wheat-sheaf logo"),
        ("set up payments", ExecutorType::Tool, "Use a card terminal provider"),
        ("hire a baker", ExecutorType::Human, "Interview three candidates"),
    ]
    .into_iter()
    .map(|(name, executor, content)| TaskDraft {
        name: name.to_string(),
        executor,
        actionable_content: content.to_string(),
    })
    .collect()
}

/// Run one execution round-trip the way the runner does
async fn execute_selected(session: &mut Session, gateway: &Arc<MockPlanGateway>) -> Result<(), SessionError> {
    let request = session.begin_execute()?;
    let outcome = match request.mode {
        ExecutionMode::Text => gateway.execute_text(&request.prompt).await.map(|result| ExecutionOutcome {
            result,
            kind: ResultKind::Text,
        }),
        ExecutionMode::Image => gateway
            .execute_image(&request.prompt, &request.image)
            .await
            .map(|image| ExecutionOutcome {
                result: image.into_uri(),
                kind: ResultKind::Image,
            }),
    };
    session.complete_execute(&request.task, outcome)
}

#[tokio::test]
async fn test_bakery_idea_to_completed_text_task() {
    let gateway = Arc::new(MockPlanGateway::new());
    gateway.push_decomposition(Ok(bakery_drafts()));
    gateway.push_text(Ok("Fresh bread, honest prices.".to_string()));

    let mut session = Session::new();
    session.submit_idea("Launch a bakery").expect("idea should submit");
    let drafts = gateway.decompose("Launch a bakery").await;
    session.complete_decompose(drafts).expect("plan should build");

    // full task list shown first; nothing auto-selected
    assert_eq!(session.phase(), &Phase::Ready);
    assert!(session.selected_id().is_none());
    let plan = session.plan().expect("plan exists");
    assert_eq!(plan.len(), 6);
    assert_eq!(plan.tasks[0].executor, ExecutorType::Human);

    // select the AI tagline task and execute in text mode
    let tagline = plan.tasks[2].id.clone();
    session.select_task(Some(tagline.clone())).unwrap();
    assert_eq!(session.mode(), ExecutionMode::Text);

    execute_selected(&mut session, &gateway).await.expect("execution should succeed");

    let task = session.plan().unwrap().task(&tagline).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.result.as_deref(), Some("Fresh bread, honest prices."));
    assert_eq!(task.result_kind, Some(ResultKind::Text));
    assert_eq!(session.progress(), (1, 6));
}

#[tokio::test]
async fn test_image_refusal_leaves_task_pending() {
    let gateway = Arc::new(MockPlanGateway::new());
    gateway.push_decomposition(Ok(bakery_drafts()));
    gateway.push_image(Err(GatewayError::Refused {
        reason: "cannot depict real storefronts".to_string(),
    }));

    let mut session = Session::new();
    session.submit_idea("Launch a bakery").unwrap();
    let drafts = gateway.decompose("Launch a bakery").await;
    session.complete_decompose(drafts).unwrap();

    let logo = session.plan().unwrap().tasks[3].id.clone();
    session.select_task(Some(logo.clone())).unwrap();
    session.set_mode(ExecutionMode::Image).unwrap();

    let err = execute_selected(&mut session, &gateway).await.unwrap_err();
    match err {
        SessionError::Gateway(GatewayError::Refused { reason }) => {
            assert!(reason.contains("storefronts"));
        }
        other => panic!("expected refusal, got {}", other),
    }

    // task untouched, session back in Ready, other tasks unaffected
    let task = session.plan().unwrap().task(&logo).unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(task.result.is_none());
    assert_eq!(session.phase(), &Phase::Ready);
    assert_eq!(session.progress(), (0, 6));
}

#[tokio::test]
async fn test_image_success_stores_data_uri() {
    let gateway = Arc::new(MockPlanGateway::new());
    gateway.push_decomposition(Ok(bakery_drafts()));
    gateway.push_image(Ok(ImageReference {
        uri: "data:image/png;base64,cG9w".to_string(),
        mime_type: "image/png".to_string(),
        bytes: 3,
    }));

    let mut session = Session::new();
    session.submit_idea("Launch a bakery").unwrap();
    let drafts = gateway.decompose("Launch a bakery").await;
    session.complete_decompose(drafts).unwrap();

    let logo = session.plan().unwrap().tasks[3].id.clone();
    session.select_task(Some(logo.clone())).unwrap();
    session.set_mode(ExecutionMode::Image).unwrap();
    session
        .set_image_config(ImageConfig::default())
        .expect("image config should apply");

    execute_selected(&mut session, &gateway).await.expect("image execution should succeed");

    let task = session.plan().unwrap().task(&logo).unwrap();
    assert_eq!(task.result_kind, Some(ResultKind::Image));
    assert!(task.result.as_deref().unwrap().starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_malformed_decomposition_returns_to_idle() {
    let gateway = Arc::new(MockPlanGateway::new());
    gateway.push_decomposition(Err(GatewayError::Decomposition(
        "response is not a valid draft list".to_string(),
    )));

    let mut session = Session::new();
    session.submit_idea("Launch a bakery").unwrap();
    let drafts = gateway.decompose("Launch a bakery").await;

    let err = session.complete_decompose(drafts).unwrap_err();
    assert!(matches!(err, SessionError::Gateway(GatewayError::Decomposition(_))));

    // no partial state: plan is gone and a fresh submit works
    assert_eq!(session.phase(), &Phase::Idle);
    assert!(session.plan().is_none());
    session.submit_idea("Launch a bakery").expect("retry should be possible");
}

#[tokio::test]
async fn test_mixed_manual_and_ai_completion_to_full_plan() {
    let gateway = Arc::new(MockPlanGateway::new());
    gateway.push_decomposition(Ok(bakery_drafts()));
    for _ in 0..3 {
        gateway.push_text(Ok("done".to_string()));
    }

    let mut session = Session::new();
    session.submit_idea("Launch a bakery").unwrap();
    let drafts = gateway.decompose("Launch a bakery").await;
    session.complete_decompose(drafts).unwrap();

    let ids: Vec<_> = session.plan().unwrap().tasks.iter().map(|t| t.id.clone()).collect();
    let executors: Vec<_> = session.plan().unwrap().tasks.iter().map(|t| t.executor).collect();

    for (id, executor) in ids.iter().zip(executors.iter()) {
        if executor.is_ai() {
            session.select_task(Some(id.clone())).unwrap();
            execute_selected(&mut session, &gateway).await.unwrap();
        } else {
            session.mark_completed(id).unwrap();
        }
    }

    assert_eq!(session.progress(), (6, 6));

    // restart discards everything
    session.restart().unwrap();
    assert_eq!(session.phase(), &Phase::Idle);
    assert!(session.plan().is_none());
}
