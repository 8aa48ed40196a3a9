use atayal_webui::error::PlaybackError;
use atayal_webui::playback::{AudioClip, AudioPlayer, ObjectUrlStore, PlaybackBackend, PlaybackTicket};
use bytes::Bytes;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingBackend {
    events: Mutex<Vec<String>>,
    live: Mutex<usize>,
    max_live: Mutex<usize>,
    next_id: Mutex<usize>,
    fail_start: bool,
}

impl RecordingBackend {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn live(&self) -> usize {
        *self.live.lock().unwrap()
    }
}

impl PlaybackBackend for RecordingBackend {
    fn create(&self, _clip: AudioClip) -> Result<PlaybackTicket, PlaybackError> {
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let id = next_id.to_string();

        let mut live = self.live.lock().unwrap();
        *live += 1;
        let mut max_live = self.max_live.lock().unwrap();
        *max_live = (*max_live).max(*live);

        self.events.lock().unwrap().push(format!("create {}", id));
        Ok(PlaybackTicket {
            url: format!("blob:{}", id),
            id,
        })
    }

    fn start(&self, ticket: &PlaybackTicket) -> Result<(), PlaybackError> {
        if self.fail_start {
            return Err(PlaybackError::Resource("autoplay blocked".to_string()));
        }
        self.events.lock().unwrap().push(format!("start {}", ticket.id));
        Ok(())
    }

    fn halt(&self, ticket: &PlaybackTicket) {
        self.events.lock().unwrap().push(format!("halt {}", ticket.id));
    }

    fn release(&self, ticket: &PlaybackTicket) {
        *self.live.lock().unwrap() -= 1;
        self.events.lock().unwrap().push(format!("release {}", ticket.id));
    }
}

fn clip(data: &'static [u8]) -> AudioClip {
    AudioClip {
        bytes: Bytes::from_static(data),
        mime_type: "audio/wav".to_string(),
    }
}

#[test]
fn newer_clip_releases_previous_before_starting() {
    let player = AudioPlayer::new(RecordingBackend::default());

    let first = player.play(clip(b"A")).unwrap();
    let second = player.play(clip(b"B")).unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(
        player.backend().events(),
        vec!["create 1", "start 1", "halt 1", "release 1", "create 2", "start 2"]
    );
    assert_eq!(player.backend().live(), 1);
    assert_eq!(*player.backend().max_live.lock().unwrap(), 1);
    assert_eq!(player.current(), Some(second));
}

#[test]
fn natural_completion_releases_current_clip() {
    let player = AudioPlayer::new(RecordingBackend::default());
    let ticket = player.play(clip(b"A")).unwrap();

    assert!(player.finished(&ticket.id));

    assert_eq!(player.backend().events(), vec!["create 1", "start 1", "release 1"]);
    assert_eq!(player.backend().live(), 0);
    assert_eq!(player.current(), None);
}

#[test]
fn stale_completion_is_ignored() {
    let player = AudioPlayer::new(RecordingBackend::default());
    let first = player.play(clip(b"A")).unwrap();
    let second = player.play(clip(b"B")).unwrap();

    assert!(!player.finished(&first.id));
    assert_eq!(player.current(), Some(second));
    assert_eq!(player.backend().live(), 1);
}

#[test]
fn manual_stop_releases_resource() {
    let player = AudioPlayer::new(RecordingBackend::default());
    player.play(clip(b"A")).unwrap();

    assert!(player.stop());
    assert!(!player.stop());

    assert_eq!(player.backend().live(), 0);
    assert_eq!(
        player.backend().events(),
        vec!["create 1", "start 1", "halt 1", "release 1"]
    );
}

#[test]
fn empty_clip_is_rejected_and_keeps_current() {
    let player = AudioPlayer::new(RecordingBackend::default());
    let ticket = player.play(clip(b"A")).unwrap();

    assert_eq!(player.play(clip(b"")).unwrap_err(), PlaybackError::EmptyAudio);
    assert_eq!(player.current(), Some(ticket));
}

#[test]
fn failed_start_releases_new_resource() {
    let player = AudioPlayer::new(RecordingBackend {
        fail_start: true,
        ..RecordingBackend::default()
    });

    let err = player.play(clip(b"A")).unwrap_err();

    assert!(matches!(err, PlaybackError::Resource(_)));
    assert_eq!(player.backend().live(), 0);
    assert_eq!(player.current(), None);
}

#[test]
fn object_url_store_keeps_only_latest_clip() {
    let player = AudioPlayer::new(ObjectUrlStore::new("/api/audio"));

    let first = player.play(clip(b"first")).unwrap();
    assert!(first.url.starts_with("/api/audio/"));
    assert!(player.backend().is_playing(&first.id));

    let second = player.play(clip(b"second")).unwrap();

    assert_eq!(player.backend().live_count(), 1);
    assert!(player.backend().fetch(&first.id).is_none());
    assert_eq!(
        player.backend().fetch(&second.id).map(|clip| clip.bytes),
        Some(Bytes::from_static(b"second"))
    );

    player.stop();
    assert_eq!(player.backend().live_count(), 0);
}

#[test]
fn concurrent_plays_leave_one_live_clip() {
    let player = Arc::new(AudioPlayer::new(ObjectUrlStore::new("/api/audio")));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let player = player.clone();
            std::thread::spawn(move || {
                for _ in 0..25 {
                    player.play(clip(b"tick")).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(player.backend().live_count(), 1);
    let current = player.current().expect("latest clip is current");
    assert!(player.backend().fetch(&current.id).is_some());
}
