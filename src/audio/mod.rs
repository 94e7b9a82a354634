pub mod chime;

use chime::CompletionChime;

use rodio::{OutputStream, Sink};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

enum AudioCommand {
    PlayChime,
}

/// Plays the countdown-completion chime on a dedicated thread that owns the
/// non-Send audio objects. The thread and output device are created lazily
/// on first use; playback failures are non-fatal.
#[derive(Clone)]
pub struct ChimeHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
}

impl ChimeHandle {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();

        thread::Builder::new()
            .name("tracker-audio".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::PlayChime => {
                            let _ = ensure_sink(&mut _stream, &mut sink);
                            if let Some(ref s) = sink {
                                s.append(CompletionChime::new());
                            }
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }

    pub fn play(&self) -> Result<(), String> {
        let tx = self.ensure_thread()?;
        tx.send(AudioCommand::PlayChime).map_err(|e| e.to_string())
    }
}

impl Default for ChimeHandle {
    fn default() -> Self {
        Self::new()
    }
}
