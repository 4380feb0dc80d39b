//! Retry budget and feedback behavior of the script synthesizer.

use std::sync::Arc;

use mockall::mock;
use pretty_assertions::assert_eq;

use promptcut_core::{Plan, ScriptSynthesizer, Step, StepContext, SynthesisError};
use promptcut_gen::{GenerationClient, GenerationRequest, GenerationServiceError};
use promptcut_plugins::IoMap;
use promptcut_test_utils::{AlwaysFailPlugin, AlwaysPassPlugin, ScriptedClient};

mock! {
    Client {}

    #[async_trait::async_trait]
    impl GenerationClient for Client {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<Vec<String>, GenerationServiceError>;
    }
}

fn context() -> StepContext {
    let mut inputs = IoMap::new();
    inputs.insert("input".to_string(), "proxy0.mp4".to_string());
    let mut outputs = IoMap::new();
    outputs.insert("output".to_string(), "proxy1.mp4".to_string());
    StepContext {
        instruction: "flip the video".to_string(),
        plan: Plan::single(Step::new("flip the video", "tool")),
        step_number: 1,
        completed: Vec::new(),
        inputs,
        outputs,
    }
}

#[tokio::test]
async fn first_certified_candidate_short_circuits() {
    let client = Arc::new(ScriptedClient::always("fine()"));
    let synthesizer = ScriptSynthesizer::new(client.clone());
    let plugin = AlwaysPassPlugin::new("tool");
    let sandbox = tempfile::tempdir().unwrap();

    let script = synthesizer
        .synthesize(&plugin, &context(), sandbox.path())
        .await
        .unwrap();
    assert_eq!(script, "fine()");
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn budget_is_three_attempts_then_exhaustion() {
    let client = Arc::new(ScriptedClient::always("broken()"));
    let synthesizer = ScriptSynthesizer::new(client.clone());
    let plugin = AlwaysFailPlugin::new("tool", "no good");
    let sandbox = tempfile::tempdir().unwrap();

    let err = synthesizer
        .synthesize(&plugin, &context(), sandbox.path())
        .await
        .unwrap_err();
    assert_eq!(client.call_count(), 3);
    match err {
        SynthesisError::ValidationExhausted {
            attempts,
            candidates,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(candidates.len(), 3);
            assert_eq!(
                candidates.iter().map(|c| c.attempt).collect::<Vec<_>>(),
                vec![1, 2, 3]
            );
            assert!(last_error.contains("no good"));
        }
        other => panic!("expected exhaustion, got {other}"),
    }
}

#[tokio::test]
async fn retries_carry_prior_failures_as_feedback() {
    let client = Arc::new(ScriptedClient::new());
    client.push_candidates(vec!["bad_one()".to_string()]);
    client.push_candidates(vec!["bad_two()".to_string()]);
    client.push_candidates(vec!["bad_three()".to_string()]);
    let synthesizer = ScriptSynthesizer::new(client.clone());
    let plugin = AlwaysFailPlugin::new("tool", "rejected");
    let sandbox = tempfile::tempdir().unwrap();

    synthesizer
        .synthesize(&plugin, &context(), sandbox.path())
        .await
        .unwrap_err();

    let requests = client.requests();
    assert_eq!(requests.len(), 3);
    assert!(!requests[0].contains("bad_one()"));
    assert!(requests[1].contains("bad_one()"));
    assert!(requests[1].contains("rejected"));
    assert!(requests[2].contains("bad_one()"));
    assert!(requests[2].contains("bad_two()"));
}

#[tokio::test]
async fn fenced_candidates_are_stripped_before_validation() {
    let client = Arc::new(ScriptedClient::always("```python\nfine()\n```"));
    let synthesizer = ScriptSynthesizer::new(client);
    let plugin = AlwaysPassPlugin::new("tool");
    let sandbox = tempfile::tempdir().unwrap();

    let script = synthesizer
        .synthesize(&plugin, &context(), sandbox.path())
        .await
        .unwrap();
    assert_eq!(script, "fine()");
}

#[tokio::test]
async fn persistent_service_failure_surfaces_after_the_budget() {
    let mut mock = MockClient::new();
    mock.expect_generate()
        .times(3)
        .returning(|_| Err(GenerationServiceError::Transport("connection refused".to_string())));
    let synthesizer = ScriptSynthesizer::new(Arc::new(mock));
    let plugin = AlwaysPassPlugin::new("tool");
    let sandbox = tempfile::tempdir().unwrap();

    let err = synthesizer
        .synthesize(&plugin, &context(), sandbox.path())
        .await
        .unwrap_err();
    assert!(matches!(err, SynthesisError::Service(_)));
}

#[tokio::test]
async fn transient_service_failure_is_retried() {
    let client = Arc::new(ScriptedClient::new());
    client.push_error(GenerationServiceError::Transport("blip".to_string()));
    client.push_candidates(vec!["fine()".to_string()]);
    let synthesizer = ScriptSynthesizer::new(client.clone());
    let plugin = AlwaysPassPlugin::new("tool");
    let sandbox = tempfile::tempdir().unwrap();

    let script = synthesizer
        .synthesize(&plugin, &context(), sandbox.path())
        .await
        .unwrap();
    assert_eq!(script, "fine()");
    assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn retry_attempts_request_more_candidates() {
    let client = Arc::new(ScriptedClient::new());
    client.push_candidates(vec!["a()".to_string()]);
    client.push_candidates(vec!["b()".to_string(), "c()".to_string(), "d()".to_string()]);
    let synthesizer = ScriptSynthesizer::new(client.clone());
    let plugin = AlwaysFailPlugin::new("tool", "nope");
    let sandbox = tempfile::tempdir().unwrap();

    let err = synthesizer
        .synthesize(&plugin, &context(), sandbox.path())
        .await
        .unwrap_err();
    match err {
        SynthesisError::ValidationExhausted { candidates, .. } => {
            // 1 candidate on attempt 1, all 3 of attempt 2, none on attempt 3.
            assert_eq!(candidates.len(), 4);
        }
        other => panic!("expected exhaustion, got {other}"),
    }
}
