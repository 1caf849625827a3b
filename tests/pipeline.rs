//! Pipeline integration tests over mocked external services

use buddy_core::services::VoiceSettings;
use buddy_core::{ErrorKind, session::Role};

mod common;
use common::harness;

#[tokio::test]
async fn text_query_labels_session_and_commits_history() {
    let h = harness();

    let outcome = h
        .ctx
        .pipeline
        .process_text_query("how do brakes work", None, None, None)
        .await
        .unwrap();

    assert_eq!(outcome.summary, "answer: how do brakes work");
    assert_eq!(outcome.topic_name, "Brakes");
    assert!(outcome.conversation_active);
    assert_eq!(outcome.relevant_chunks.len(), 1);
    assert!(outcome.confidence.is_none());

    let session = h.ctx.sessions.history(&outcome.session_id).await.unwrap();
    assert_eq!(session.history.len(), 2);
    assert_eq!(session.history[0].role, Role::User);
    assert_eq!(session.history[0].content, "how do brakes work");
    assert_eq!(session.history[1].role, Role::Assistant);
}

#[tokio::test]
async fn follow_up_query_carries_prior_turns() {
    let h = harness();

    let first = h
        .ctx
        .pipeline
        .process_text_query("how do brakes work", None, None, None)
        .await
        .unwrap();

    h.ctx
        .pipeline
        .process_text_query("what about the rotors", Some(&first.session_id), None, None)
        .await
        .unwrap();

    // The answerer saw the two turns from the first exchange.
    assert_eq!(h.answerer.last_history_len(), 2);

    let session = h.ctx.sessions.history(&first.session_id).await.unwrap();
    assert_eq!(session.history.len(), 4);
}

#[tokio::test]
async fn topic_change_cue_forces_new_session() {
    let h = harness();
    let original = h.ctx.sessions.create(Some("Engine")).await;

    let outcome = h
        .ctx
        .pipeline
        .process_text_query(
            "What about the brakes instead, let's move on to a different topic",
            Some(&original.id),
            None,
            None,
        )
        .await
        .unwrap();

    assert_ne!(outcome.session_id, original.id);
    assert_eq!(outcome.topic_name, "Brakes");

    // The original session is untouched.
    let untouched = h.ctx.sessions.history(&original.id).await.unwrap();
    assert!(untouched.history.is_empty());
    assert_eq!(untouched.topic_name, "Engine");
}

#[tokio::test]
async fn existing_topic_label_is_not_overwritten() {
    let h = harness();
    let session = h.ctx.sessions.create(Some("Engine")).await;

    let outcome = h
        .ctx
        .pipeline
        .process_text_query("how do brakes work", Some(&session.id), None, None)
        .await
        .unwrap();

    assert_eq!(outcome.session_id, session.id);
    assert_eq!(outcome.topic_name, "Engine");
}

#[tokio::test]
async fn answer_failure_leaves_history_untouched() {
    let h = harness();

    let first = h
        .ctx
        .pipeline
        .process_text_query("how do brakes work", None, None, None)
        .await
        .unwrap();

    h.answerer.set_fail(true);
    let err = h
        .ctx
        .pipeline
        .process_text_query("and the rotors?", Some(&first.session_id), None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);

    // No orphaned user turn.
    let session = h.ctx.sessions.history(&first.session_id).await.unwrap();
    assert_eq!(session.history.len(), 2);
}

#[tokio::test]
async fn search_failure_leaves_history_untouched() {
    let h = harness();

    let first = h
        .ctx
        .pipeline
        .process_text_query("how do brakes work", None, None, None)
        .await
        .unwrap();

    h.knowledge.set_fail(true);
    assert!(
        h.ctx
            .pipeline
            .process_text_query("and the rotors?", Some(&first.session_id), None, None)
            .await
            .is_err()
    );

    let session = h.ctx.sessions.history(&first.session_id).await.unwrap();
    assert_eq!(session.history.len(), 2);
}

#[tokio::test]
async fn search_parameters_default_and_override() {
    let h = harness();

    h.ctx
        .pipeline
        .process_text_query("how do brakes work", None, None, None)
        .await
        .unwrap();
    assert_eq!(h.knowledge.last_k(), 5);

    h.ctx
        .pipeline
        .process_text_query("how do brakes work", None, Some(2), Some(0.5))
        .await
        .unwrap();
    assert_eq!(h.knowledge.last_k(), 2);
}

#[tokio::test]
async fn empty_query_is_invalid() {
    let h = harness();
    let err = h
        .ctx
        .pipeline
        .process_text_query("   ", None, None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn audio_query_attaches_confidence() {
    let h = harness();

    let outcome = h
        .ctx
        .pipeline
        .process_audio_query(b"fake-wav-bytes", None)
        .await
        .unwrap();

    // The mock recognizer hears "how do brakes work" at 0.9.
    assert_eq!(outcome.topic_name, "Brakes");
    assert_eq!(outcome.confidence, Some(0.9));
}

#[tokio::test]
async fn empty_audio_is_invalid() {
    let h = harness();
    let err = h
        .ctx
        .pipeline
        .process_audio_query(&[], None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn synthesize_validates_settings() {
    let h = harness();

    let audio = h
        .ctx
        .pipeline
        .synthesize("Your brake pads are worn.", &VoiceSettings::default())
        .await
        .unwrap();
    assert!(!audio.is_empty());

    let err = h
        .ctx
        .pipeline
        .synthesize("", &VoiceSettings::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let too_fast = VoiceSettings {
        rate: 400,
        ..VoiceSettings::default()
    };
    let err = h.ctx.pipeline.synthesize("hi", &too_fast).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let too_loud = VoiceSettings {
        volume: 1.5,
        ..VoiceSettings::default()
    };
    let err = h.ctx.pipeline.synthesize("hi", &too_loud).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}
