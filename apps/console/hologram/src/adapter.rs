//! Console presentation adapter.
//!
//! Renders the mirrored state as log lines instead of pixels. Reacts to the
//! store for status/mode/voice transitions, and to routed messages only while
//! the matching view is up: transcripts, speech and errors on the voice
//! view; waves, motion and camera frames on the vision view.
//!
//! The adapter never writes to the store.

use mirror_core::context::MirrorContext;
use mirror_core::gate::ModeGate;
use mirror_core::lock;
use mirror_core::router::RouteKey;
use mirror_core::store::Subscription;
use models::{Action, InboundMessage, InteractionMode, MessageKind, StateSnapshot, VoiceState};

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

/// What the console is currently "showing".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Screen {
    pub last_snapshot: Option<StateSnapshot>,
    pub transcript: Option<String>,
    pub caption: Option<String>,
    pub error: Option<String>,
    pub video_frames: u64,
    pub waves: u64,
    pub motions: u64,
}

pub struct ConsoleAdapter {
    screen: Arc<Mutex<Screen>>,
    subscription: Option<Subscription>,
}

impl ConsoleAdapter {
    /// Subscribe to the store and register gated listeners on the router.
    pub fn attach(context: &MirrorContext) -> Self {
        let screen = Arc::new(Mutex::new(Screen::default()));

        let rendered = Arc::clone(&screen);
        let subscription = context
            .store()
            .subscribe(move |snapshot| render_snapshot(&mut lock(&rendered), snapshot));

        let router = context.router();
        let voice = ModeGate::new(context.store().clone(), InteractionMode::Voice);
        let vision = ModeGate::new(context.store().clone(), InteractionMode::Vision);

        let target = Arc::clone(&screen);
        voice.on(router, MessageKind::Transcribe, move |message| {
            if let InboundMessage::Transcribe { text } = message {
                info!("You said: {text}");
                lock(&target).transcript = Some(text.clone());
            }
        });

        let target = Arc::clone(&screen);
        voice.on(router, RouteKey::action("speak"), move |message| {
            if let InboundMessage::Action(Action::Speak(speak)) = message {
                let caption = speak.text.clone().unwrap_or_default();
                match speak.duration {
                    Some(seconds) => info!(
                        "Speaking ({seconds:.1}s from {}): {caption}",
                        speak.audio_path
                    ),
                    None => info!("Speaking (from {}): {caption}", speak.audio_path),
                }
                lock(&target).caption = Some(caption);
            }
        });

        let target = Arc::clone(&screen);
        voice.on(router, MessageKind::Error, move |message| {
            if let InboundMessage::Error { message } = message {
                warn!("Voice error: {message}");
                lock(&target).error = Some(message.clone());
            }
        });

        let target = Arc::clone(&screen);
        vision.on(router, MessageKind::Video, move |message| {
            if let InboundMessage::Video { data } = message {
                let mut screen = lock(&target);
                screen.video_frames += 1;
                debug!("Frame #{} ({} bytes base64)", screen.video_frames, data.len());
            }
        });

        let target = Arc::clone(&screen);
        vision.on(router, RouteKey::action("wave"), move |_| {
            info!("Wave detected, hello!");
            lock(&target).waves += 1;
        });

        let target = Arc::clone(&screen);
        vision.on(router, RouteKey::action("motion_detected"), move |_| {
            info!("Motion detected");
            lock(&target).motions += 1;
        });

        Self {
            screen,
            subscription: Some(subscription),
        }
    }

    pub fn screen(&self) -> Screen {
        lock(&self.screen).clone()
    }

    /// Stop rendering store changes. Router listeners stay registered but
    /// keep updating only the internal screen.
    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

fn render_snapshot(screen: &mut Screen, snapshot: &StateSnapshot) {
    let previous = screen.last_snapshot.replace(*snapshot);

    let Some(previous) = previous else {
        info!(
            "Mirror: {} | view {} | voice {}",
            snapshot.status, snapshot.mode, snapshot.voice_state
        );
        return;
    };

    if previous.status != snapshot.status {
        info!("Connection: {}", snapshot.status);
    }

    if previous.mode != snapshot.mode {
        info!("View: {}", snapshot.mode);
        screen.transcript = None;
        screen.caption = None;
        screen.error = None;
    }

    if previous.voice_state != snapshot.voice_state && snapshot.mode == InteractionMode::Voice {
        info!("{}", voice_prompt(snapshot.voice_state));
        if snapshot.voice_state == VoiceState::Listening {
            screen.error = None;
        }
    }
}

/// Text the voice view shows for each sub-state.
pub fn voice_prompt(state: VoiceState) -> &'static str {
    match state {
        VoiceState::Idle => "Say something or type `start`",
        VoiceState::Requested => "Starting microphone...",
        VoiceState::Listening => "Listening...",
        VoiceState::Waiting => "Thinking...",
        VoiceState::Playing => "Speaking...",
    }
}
