//! # Sound Module
//!
//! Plays answer cues on the default output device. The output stream is
//! owned by its own thread; the session posts [`Cue`]s through a channel.

use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, select};
use fretly_core::cues::{Cue, synthesize};

/// Cues waiting to be played; older ones are dropped when it is full.
const CUE_QUEUE: usize = 4;

pub struct SoundWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SoundWorker {
    /// Spawns the playback thread.
    ///
    /// # Returns
    /// * The worker (if the thread started) and the cue sender to give to the
    ///   session. Without a worker the sender simply drops every cue.
    pub fn start() -> (Option<Self>, Sender<Cue>) {
        let (cue_tx, cue_rx) = crossbeam_channel::bounded(CUE_QUEUE);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let spawned = thread::Builder::new()
            .name("cue-playback".into())
            .spawn(move || {
                if let Err(e) = run(cue_rx, shutdown_rx) {
                    log::warn!("[CUES] Sound disabled: {:#}", e);
                }
            });

        match spawned {
            Ok(handle) => (
                Some(Self {
                    shutdown_tx,
                    thread_handle: Some(handle),
                }),
                cue_tx,
            ),
            Err(e) => {
                log::warn!("[CUES] Could not spawn the playback thread: {}", e);
                (None, cue_tx)
            }
        }
    }
}

impl Drop for SoundWorker {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(cues: Receiver<Cue>, shutdown: Receiver<()>) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("No output device available"))?;
    let supported = device
        .default_output_config()
        .context("Could not query the output format")?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(anyhow!("Output format {:?} is not supported", supported.sample_format()));
    }

    let sample_rate = supported.sample_rate().0;
    let channels = usize::from(supported.channels());
    let config: cpal::StreamConfig = supported.into();

    let (samples_tx, samples_rx) = crossbeam_channel::unbounded::<Vec<f32>>();
    let mut playing: Vec<f32> = Vec::new();
    let mut position = 0;

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for out in data.chunks_mut(channels) {
                    if position >= playing.len() {
                        // A new cue replaces whatever finished.
                        match samples_rx.try_recv() {
                            Ok(next) => {
                                playing = next;
                                position = 0;
                            }
                            Err(_) => {
                                out.fill(0.0);
                                continue;
                            }
                        }
                    }
                    let sample = playing.get(position).copied().unwrap_or(0.0);
                    out.fill(sample);
                    position += 1;
                }
            },
            |err| log::error!("[CUES] Output stream error: {}", err),
            None,
        )
        .context("Could not open the output stream")?;
    stream.play().context("Could not start the output stream")?;
    log::info!("[CUES] Playback ready at {} Hz", sample_rate);

    loop {
        select! {
            recv(cues) -> cue => match cue {
                Ok(cue) => {
                    let _ = samples_tx.send(synthesize(cue, sample_rate));
                }
                Err(_) => break,
            },
            recv(shutdown) -> _ => break,
        }
    }

    let _ = stream.pause();
    Ok(())
}
