use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::runtime::Builder;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::frame_interface::{put_output_words, HeaderBytes, SmurfHeader, HEADER_SIZE};
use crate::prelude::{
    lock, FrameSink, OutputWord, ProcessorError, ProcessorResult, SinkError, OUTPUT_WORD_SIZE,
};
use crate::telemetry::{LogManager, MetricsRecorder};

/// Upper bound on how long the idle transmitter sleeps between checks.
pub const TX_WAIT: Duration = Duration::from_secs(10);

const THREAD_NAME: &str = "pktTransmitter";

/// Output of one processed frame, waiting to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFrame {
    /// Input header with the channel count already rewritten.
    pub header: HeaderBytes,
    pub data: Vec<OutputWord>,
}

/// Size of the output frame for a header declaring `channels` channels.
pub fn output_frame_size(payload_size: usize, channels: usize) -> usize {
    HEADER_SIZE + payload_size.max(channels) * OUTPUT_WORD_SIZE
}

struct TxShared {
    slot: Mutex<Option<StagedFrame>>,
    payload_size: AtomicUsize,
    running: AtomicBool,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

/// Background sender fed through a single "latest wins" slot.
///
/// `stage` never blocks on the sending side: a frame still waiting in the
/// slot when a newer one arrives is dropped.
pub struct Transmitter {
    shared: Arc<TxShared>,
    ready: watch::Sender<u64>,
    handle: Option<JoinHandle<()>>,
}

impl Transmitter {
    pub fn spawn<S: FrameSink>(sink: S, metrics: Arc<MetricsRecorder>) -> ProcessorResult<Self> {
        let shared = Arc::new(TxShared {
            slot: Mutex::new(None),
            payload_size: AtomicUsize::new(0),
            running: AtomicBool::new(true),
            metrics,
            logger: LogManager::default(),
        });
        let (ready, receiver) = watch::channel(0u64);

        let thread_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run(thread_shared, receiver, sink))
            .map_err(ProcessorError::TransmitterStart)?;

        Ok(Self {
            shared,
            ready,
            handle: Some(handle),
        })
    }

    pub fn payload_size(&self) -> usize {
        self.shared.payload_size.load(Ordering::Relaxed)
    }

    /// Minimum number of channel slots reserved in every output frame.
    pub fn set_payload_size(&self, size: usize) {
        self.shared.payload_size.store(size, Ordering::Relaxed);
    }

    /// Replaces the staged frame and wakes the sending thread.
    pub fn stage(&self, frame: StagedFrame) {
        let superseded = lock(&self.shared.slot).replace(frame).is_some();
        self.shared.metrics.record_staged(superseded);
        if superseded {
            self.shared
                .logger
                .debug("Staged frame superseded before transmission");
        }
        self.ready.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stops the sending thread and waits for it to exit.
    pub fn shutdown(&mut self) -> ProcessorResult<()> {
        self.shared.running.store(false, Ordering::Release);
        self.ready.send_modify(|generation| *generation = generation.wrapping_add(1));
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ProcessorError::TransmitterPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for Transmitter {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            self.shared.logger.error(&format!("{}", err));
        }
    }
}

fn run<S: FrameSink>(shared: Arc<TxShared>, mut ready: watch::Receiver<u64>, mut sink: S) {
    let runtime = match Builder::new_current_thread().enable_time().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            shared
                .logger
                .error(&format!("Transmitter runtime could not be built: {}", err));
            return;
        }
    };

    shared.logger.record("Transmitter thread started");
    runtime.block_on(async {
        while shared.running.load(Ordering::Acquire) {
            let _ = ready.borrow_and_update();
            let staged = lock(&shared.slot).take();
            match staged {
                Some(frame) => shared.transmit(frame, &mut sink),
                None => {
                    // Timing out just re-checks the stop flag.
                    if let Ok(Err(_)) = timeout(TX_WAIT, ready.changed()).await {
                        break;
                    }
                }
            }
        }
    });
    shared.logger.record("Transmitter thread interrupted");
}

impl TxShared {
    fn transmit<S: FrameSink>(&self, frame: StagedFrame, sink: &mut S) {
        let result = self
            .assemble(frame, sink)
            .and_then(|buffer| sink.send_frame(buffer));
        match result {
            Ok(()) => self.metrics.record_sent(),
            Err(err) => {
                self.metrics.record_send_failure();
                self.logger
                    .error(&format!("Failed to transmit output frame: {}", err));
            }
        }
    }

    fn assemble<S: FrameSink>(&self, frame: StagedFrame, sink: &mut S) -> Result<Vec<u8>, SinkError> {
        let header = SmurfHeader::from_bytes(frame.header);
        let channels = header.number_of_channels() as usize;
        let size = output_frame_size(self.payload_size.load(Ordering::Relaxed), channels);

        let mut buffer = sink.request_frame(size)?;
        if buffer.len() < size {
            return Err(SinkError::Allocation(size));
        }
        buffer[..HEADER_SIZE].copy_from_slice(header.bytes());
        put_output_words(&mut buffer[HEADER_SIZE..], &frame.data);
        Ok(buffer)
    }
}
