//! Playback slot protocol and volume semantics, exercised against counting
//! doubles behind the sink seam.

mod helpers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use helpers::{memory_source, CountingSink, Op, TrackedSource};
use skald_snd::engine::AudioEngine;
use skald_snd::playback::Outcome;
use skald_snd::resource::{MediaFormat, ResourceKind};
use skald_snd::{Channel, Error, PlaybackEvent, Settings};

fn engine_with_log() -> (AudioEngine<CountingSink>, Arc<helpers::SinkLog>) {
    let (sink, log) = CountingSink::new();
    let engine = AudioEngine::new(sink, Settings::default());
    log.clear_ops();
    (engine, log)
}

#[test]
fn replace_while_active_halts_releases_then_loads() {
    let (mut engine, log) = engine_with_log();

    let outcome = engine
        .play(Channel::Music, memory_source(64), 64, ResourceKind::Mp3, false)
        .unwrap();
    assert_eq!(outcome, Outcome::Started);
    assert_eq!(
        log.ops(),
        vec![
            Op::Halt(Channel::Music),
            Op::SetVolume(Channel::Music, 128),
            Op::Load(Channel::Music, MediaFormat::Mp3, false),
        ]
    );

    // Replacing the active track: exactly one halt, one release of the old
    // voice, then one load of the new, in that order.
    log.clear_ops();
    engine
        .play(Channel::Music, memory_source(64), 64, ResourceKind::Xm, true)
        .unwrap();
    assert_eq!(
        log.ops(),
        vec![
            Op::Halt(Channel::Music),
            Op::Release(Channel::Music),
            Op::SetVolume(Channel::Music, 128),
            Op::Load(Channel::Music, MediaFormat::Module, true),
        ]
    );
}

#[test]
fn at_most_one_voice_is_ever_alive_per_slot() {
    let (mut engine, log) = engine_with_log();

    // Repeated replacement on one slot never overlaps two voices, not even
    // transiently.
    for looped in [false, true, false] {
        engine
            .play(Channel::Music, memory_source(32), 32, ResourceKind::Mp3, looped)
            .unwrap();
    }
    assert_eq!(log.max_live_voices(), 1);

    // The second slot adds exactly one more.
    engine
        .play(Channel::Sample, memory_source(32), 32, ResourceKind::Wav, false)
        .unwrap();
    assert_eq!(log.max_live_voices(), 2);
    assert_eq!(log.live_voices(), 2);

    engine.stop(Channel::Music);
    engine.stop(Channel::Sample);
    assert_eq!(log.live_voices(), 0);
}

#[test]
fn unrecognized_type_fails_without_leaking_twice_in_a_row() {
    let (mut engine, log) = engine_with_log();
    let closes = Arc::new(AtomicUsize::new(0));
    let seeks = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let source = TrackedSource::new(vec![0u8; 64], Arc::clone(&closes), Arc::clone(&seeks));
        let err = engine
            .play(Channel::Music, source, 64, ResourceKind::Jpeg, false)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownResourceType(_)));
        assert!(!engine.is_playing(Channel::Music));
    }

    // Both windows were released, no voice was ever created.
    assert_eq!(closes.load(Ordering::SeqCst), 2);
    assert_eq!(log.live_voices(), 0);
    assert!(log.ops().iter().all(|op| !matches!(op, Op::Load(..))));
}

#[test]
fn disabled_channel_declines_without_opening_the_source() {
    let (sink, log) = CountingSink::new();
    let settings = Settings {
        enable_music: false,
        ..Settings::default()
    };
    let mut engine = AudioEngine::new(sink, settings);
    log.clear_ops();

    let closes = Arc::new(AtomicUsize::new(0));
    let seeks = Arc::new(AtomicUsize::new(0));
    let source = TrackedSource::new(vec![0u8; 64], Arc::clone(&closes), Arc::clone(&seeks));

    let outcome = engine
        .play(Channel::Music, source, 64, ResourceKind::Mp3, false)
        .unwrap();
    assert_eq!(outcome, Outcome::Declined);

    // The source was dropped unopened and the slot was never touched.
    assert_eq!(seeks.load(Ordering::SeqCst), 0);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(log.ops().is_empty());
    assert!(!engine.is_playing(Channel::Music));

    // The sample channel is still live.
    let outcome = engine
        .play(Channel::Sample, memory_source(32), 32, ResourceKind::Wav, false)
        .unwrap();
    assert_eq!(outcome, Outcome::Started);
}

#[test]
fn failed_load_leaves_the_slot_idle_and_recoverable() {
    let (mut engine, log) = engine_with_log();

    engine
        .play(Channel::Music, memory_source(64), 64, ResourceKind::Mp3, true)
        .unwrap();

    log.fail_next_loads(true);
    let err = engine
        .play(Channel::Music, memory_source(64), 64, ResourceKind::Mp3, false)
        .unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
    assert!(!engine.is_playing(Channel::Music));
    assert_eq!(log.live_voices(), 0);

    // The failure did not corrupt the slot; the next request succeeds.
    log.fail_next_loads(false);
    let outcome = engine
        .play(Channel::Music, memory_source(64), 64, ResourceKind::Mp3, false)
        .unwrap();
    assert_eq!(outcome, Outcome::Started);
    assert!(engine.is_playing(Channel::Music));
}

#[test]
fn stop_is_safe_in_any_state() {
    let (mut engine, log) = engine_with_log();

    // Stopping an idle channel still halts, releases nothing.
    engine.stop(Channel::Music);
    assert_eq!(log.ops(), vec![Op::Halt(Channel::Music)]);

    log.clear_ops();
    engine
        .play(Channel::Music, memory_source(64), 64, ResourceKind::Mp3, true)
        .unwrap();
    log.clear_ops();

    engine.stop(Channel::Music);
    assert_eq!(
        log.ops(),
        vec![Op::Halt(Channel::Music), Op::Release(Channel::Music)]
    );
    assert_eq!(log.live_voices(), 0);

    log.clear_ops();
    engine.stop(Channel::Music);
    assert_eq!(log.ops(), vec![Op::Halt(Channel::Music)]);
}

#[test]
fn natural_finish_releases_the_voice_and_notifies() {
    let (mut engine, log) = engine_with_log();
    let (event_tx, event_rx) = mpsc::channel();
    engine.set_event_sender(event_tx);

    engine
        .play(Channel::Sample, memory_source(32), 32, ResourceKind::Wav, false)
        .unwrap();
    assert_eq!(
        event_rx.try_recv(),
        Ok(PlaybackEvent::Started {
            channel: Channel::Sample,
            looped: false
        })
    );

    // Nothing finished yet: reaping changes nothing.
    engine.reap_finished();
    assert_eq!(log.live_voices(), 1);
    assert!(event_rx.try_recv().is_err());

    // Simulate the voice reaching its natural end.
    log.last_playing_flag().store(false, Ordering::SeqCst);
    engine.reap_finished();
    assert_eq!(log.live_voices(), 0);
    assert!(!engine.is_playing(Channel::Sample));
    assert_eq!(
        event_rx.try_recv(),
        Ok(PlaybackEvent::Finished {
            channel: Channel::Sample
        })
    );
}

#[test]
fn mute_then_unmute_restores_the_exact_device_volume() {
    let (mut engine, log) = engine_with_log();

    for logical in (0..=100).step_by(10) {
        for attenuation in (0..=100).step_by(10) {
            engine.set_attenuation(attenuation);
            engine.set_volume(Channel::Music, logical);
            engine.set_volume(Channel::Sample, 100 - logical);

            let music = engine.volume_state().device_volume(Channel::Music);
            let sample = engine.volume_state().device_volume(Channel::Sample);

            log.clear_ops();
            engine.set_muted(true);
            assert_eq!(
                log.ops(),
                vec![
                    Op::SetVolume(Channel::Music, 0),
                    Op::SetVolume(Channel::Sample, 0),
                ]
            );

            log.clear_ops();
            engine.set_muted(false);
            assert_eq!(
                log.ops(),
                vec![
                    Op::SetVolume(Channel::Music, music),
                    Op::SetVolume(Channel::Sample, sample),
                ]
            );
        }
    }
}

#[test]
fn volume_changes_while_muted_are_stored_but_not_pushed() {
    let (mut engine, log) = engine_with_log();

    engine.set_muted(true);
    log.clear_ops();

    engine.set_volume(Channel::Music, 30);
    engine.set_attenuation(80);
    assert!(log.ops().is_empty());

    engine.set_muted(false);
    let expected = engine.volume_state().device_volume(Channel::Music);
    assert!(log.ops().contains(&Op::SetVolume(Channel::Music, expected)));
}

#[test]
fn attenuation_follows_the_quadratic_curve() {
    let (mut engine, log) = engine_with_log();

    engine.set_volume(Channel::Music, 50);
    log.clear_ops();

    engine.set_attenuation(100);
    engine.set_attenuation(50);

    let volumes: Vec<u8> = log
        .ops()
        .iter()
        .filter_map(|op| match op {
            Op::SetVolume(Channel::Music, v) => Some(*v),
            _ => None,
        })
        .collect();

    // 50% logical scales to 64; halving the attenuation quarters it.
    assert_eq!(volumes, vec![64, 16]);
}

#[test]
fn muted_play_starts_the_voice_at_zero_volume() {
    let (mut engine, log) = engine_with_log();
    engine.set_muted(true);
    log.clear_ops();

    engine
        .play(Channel::Music, memory_source(64), 64, ResourceKind::Mp3, false)
        .unwrap();
    assert_eq!(
        log.ops(),
        vec![
            Op::Halt(Channel::Music),
            Op::SetVolume(Channel::Music, 0),
            Op::Load(Channel::Music, MediaFormat::Mp3, false),
        ]
    );
}
