use crate::adapter::{ConsoleAdapter, voice_prompt};

use mirror_core::config::ClientConfig;
use mirror_core::context::MirrorContext;
use models::{
    Action, ConnectionStatus, InboundMessage, InteractionMode, SpeakAction, VoiceState,
};

fn attached() -> (MirrorContext, ConsoleAdapter) {
    let context = MirrorContext::new(&ClientConfig::default()).unwrap();
    let adapter = ConsoleAdapter::attach(&context);
    (context, adapter)
}

fn transcript(text: &str) -> InboundMessage {
    InboundMessage::Transcribe {
        text: text.to_string(),
    }
}

#[test]
fn given_attached_adapter_when_inspected_then_current_snapshot_rendered() {
    let (context, adapter) = attached();

    assert_eq!(adapter.screen().last_snapshot, Some(context.store().snapshot()));
}

/// **VALUE**: Voice content is only shown while the voice view is up.
///
/// **BUG THIS CATCHES**: Would catch a listener registered without its mode
/// gate, rendering transcripts over the vision view.
#[test]
fn given_vision_mode_when_transcript_arrives_then_ignored() {
    // GIVEN: The vision view
    let (context, adapter) = attached();
    context.store().set_mode(InteractionMode::Vision);

    // WHEN: A transcript arrives
    context.router().dispatch(&transcript("hello mirror"));

    // THEN: Nothing is shown
    assert_eq!(adapter.screen().transcript, None);

    // AND: The same transcript in voice mode is shown
    context.store().set_mode(InteractionMode::Voice);
    context.router().dispatch(&transcript("hello mirror"));
    assert_eq!(adapter.screen().transcript.as_deref(), Some("hello mirror"));
}

#[test]
fn given_voice_mode_when_speak_action_arrives_then_caption_shown() {
    let (context, adapter) = attached();
    context.store().set_mode(InteractionMode::Voice);

    context
        .router()
        .dispatch(&InboundMessage::Action(Action::Speak(SpeakAction {
            audio_path: String::from("/tmp/reply.mp3"),
            text: Some(String::from("It is sunny")),
            duration: Some(1.5),
        })));

    assert_eq!(adapter.screen().caption.as_deref(), Some("It is sunny"));
}

#[test]
fn given_voice_mode_when_backend_error_arrives_then_error_shown_and_voice_idle() {
    let (context, adapter) = attached();
    context.store().set_mode(InteractionMode::Voice);
    context.store().set_voice_state(VoiceState::Waiting);

    context.router().dispatch(&InboundMessage::Error {
        message: String::from("speech timeout"),
    });

    assert_eq!(adapter.screen().error.as_deref(), Some("speech timeout"));
    assert_eq!(context.store().voice_state(), VoiceState::Idle);
}

#[test]
fn given_vision_mode_when_vision_events_arrive_then_counted() {
    let (context, adapter) = attached();
    context.store().set_mode(InteractionMode::Vision);

    context.router().dispatch(&InboundMessage::Action(Action::Wave));
    context
        .router()
        .dispatch(&InboundMessage::Action(Action::MotionDetected));
    context.router().dispatch(&InboundMessage::Video {
        data: String::from("/9j/4AAQ"),
    });

    let screen = adapter.screen();
    assert_eq!((screen.waves, screen.motions, screen.video_frames), (1, 1, 1));
}

#[test]
fn given_voice_mode_when_vision_events_arrive_then_ignored() {
    let (context, adapter) = attached();
    context.store().set_mode(InteractionMode::Voice);

    context.router().dispatch(&InboundMessage::Action(Action::Wave));
    context.router().dispatch(&InboundMessage::Video {
        data: String::from("/9j/4AAQ"),
    });

    let screen = adapter.screen();
    assert_eq!((screen.waves, screen.video_frames), (0, 0));
}

#[test]
fn given_shown_content_when_view_changes_then_cleared() {
    let (context, adapter) = attached();
    context.store().set_mode(InteractionMode::Voice);
    context.router().dispatch(&transcript("turn on the lights"));

    context.store().set_mode(InteractionMode::Vision);

    assert_eq!(adapter.screen().transcript, None);
}

#[test]
fn given_detached_adapter_when_state_changes_then_snapshot_not_rendered() {
    let (context, mut adapter) = attached();
    adapter.detach();

    context.store().set_status(ConnectionStatus::Reconnecting);

    assert_eq!(
        adapter.screen().last_snapshot.map(|snapshot| snapshot.status),
        Some(ConnectionStatus::Disconnected)
    );
}

#[test]
fn given_each_voice_state_when_prompted_then_prompt_is_distinct() {
    let states = [
        VoiceState::Idle,
        VoiceState::Requested,
        VoiceState::Listening,
        VoiceState::Waiting,
        VoiceState::Playing,
    ];
    let mut prompts: Vec<_> = states.iter().map(|state| voice_prompt(*state)).collect();
    prompts.dedup();

    assert_eq!(prompts.len(), states.len());
}
