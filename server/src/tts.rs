//! F5-TTS engine wrapper using PyO3.
//!
//! This module bridges to the Python `f5_tts` package for voice-cloning
//! synthesis. The vocoder and acoustic model are loaded once at startup and
//! held for the life of the process.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hf_hub::api::sync::Api;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use thiserror::Error;

/// HuggingFace repository holding the F5-TTS v1 Base checkpoint.
pub const CKPT_REPO: &str = "SWivid/F5-TTS";
/// Checkpoint file within the repository.
pub const CKPT_FILE: &str = "F5TTS_v1_Base/model_1250000.safetensors";

/// DiT hyperparameters for F5-TTS v1 Base. Fixed at build time; requests
/// cannot reconfigure the model.
const MODEL_DIM: usize = 1024;
const MODEL_DEPTH: usize = 22;
const MODEL_HEADS: usize = 16;
const MODEL_FF_MULT: usize = 2;
const MODEL_TEXT_DIM: usize = 512;
const MODEL_CONV_LAYERS: usize = 4;

/// Number of flow-matching steps per synthesis call.
pub const NFE_STEP: u32 = 32;
/// Speech speed multiplier.
pub const SPEED: f64 = 1.0;
/// Sampling seed, fixed so identical inputs produce identical audio.
pub const SEED: u64 = 42;

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("TTS initialization failed: {0}")]
    InitError(String),
    #[error("Synthesis failed: {0}")]
    SynthesisError(String),
    #[error("Python error: {0}")]
    PythonError(String),
}

impl From<PyErr> for TtsError {
    fn from(err: PyErr) -> Self {
        TtsError::PythonError(err.to_string())
    }
}

/// One voice-cloning job: a staged reference clip plus the text to speak.
///
/// An empty `ref_text` asks the pipeline to auto-transcribe the reference.
#[derive(Debug)]
pub struct CloneRequest<'a> {
    pub ref_audio: &'a Path,
    pub ref_text: &'a str,
    pub text: &'a str,
}

/// Mono waveform returned by synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Synthesis backend seam.
///
/// The HTTP layer only sees this trait; production uses [`F5Engine`], tests
/// substitute a deterministic stub.
pub trait TtsEngine: Send + Sync {
    fn synthesize(&self, req: CloneRequest<'_>) -> Result<Waveform, TtsError>;
}

struct Handles {
    vocoder: PyObject,
    model: PyObject,
}

/// TTS engine backed by the F5-TTS Python implementation.
pub struct F5Engine {
    // The f5_tts inference routines are not documented as safe for
    // concurrent invocation, so all calls serialize on this lock.
    handles: Mutex<Handles>,
}

impl F5Engine {
    /// Load the vocoder and acoustic model. Called exactly once at startup;
    /// any failure is fatal to the process.
    pub fn load() -> Result<Self, TtsError> {
        let ckpt = checkpoint_path()?;
        tracing::info!(ckpt = %ckpt.display(), "Checkpoint resolved");

        Python::with_gil(|py| {
            let utils = py.import("f5_tts.infer.utils_infer")?;

            let vocoder = utils.call_method0("load_vocoder")?;

            let dit = py.import("f5_tts.model")?.getattr("DiT")?;
            let cfg = PyDict::new(py);
            cfg.set_item("dim", MODEL_DIM)?;
            cfg.set_item("depth", MODEL_DEPTH)?;
            cfg.set_item("heads", MODEL_HEADS)?;
            cfg.set_item("ff_mult", MODEL_FF_MULT)?;
            cfg.set_item("text_dim", MODEL_TEXT_DIM)?;
            cfg.set_item("conv_layers", MODEL_CONV_LAYERS)?;

            let model = utils.call_method1(
                "load_model",
                (dit, cfg, ckpt.to_string_lossy().as_ref()),
            )?;

            Ok(Self {
                handles: Mutex::new(Handles {
                    vocoder: vocoder.unbind(),
                    model: model.unbind(),
                }),
            })
        })
    }
}

impl TtsEngine for F5Engine {
    fn synthesize(&self, req: CloneRequest<'_>) -> Result<Waveform, TtsError> {
        let handles = self
            .handles
            .lock()
            .map_err(|e| TtsError::SynthesisError(format!("Lock error: {}", e)))?;

        Python::with_gil(|py| {
            let utils = py.import("f5_tts.infer.utils_infer")?;

            // Trim/resample the reference clip and resolve its transcript
            // (auto-transcribed when the caller supplied none).
            let pre = utils.call_method1(
                "preprocess_ref_audio_text",
                (req.ref_audio.to_string_lossy().as_ref(), req.ref_text),
            )?;
            let ref_audio = pre.get_item(0)?;
            let ref_text: String = pre.get_item(1)?.extract()?;

            // Fixed seed: identical inputs sample identical trajectories.
            py.import("torch")?.call_method1("manual_seed", (SEED,))?;

            let kwargs = PyDict::new(py);
            kwargs.set_item("nfe_step", NFE_STEP)?;
            kwargs.set_item("speed", SPEED)?;

            let out = utils.call_method(
                "infer_process",
                (
                    ref_audio,
                    ref_text.as_str(),
                    req.text,
                    handles.model.bind(py),
                    handles.vocoder.bind(py),
                ),
                Some(&kwargs),
            )?;

            let wave = out.get_item(0)?;
            let sample_rate: u32 = out.get_item(1)?.extract()?;

            let flat = wave.call_method0("flatten")?;
            let samples: Vec<f32> = flat.extract()?;

            Ok(Waveform {
                samples,
                sample_rate,
            })
        })
    }
}

/// Resolve the fixed checkpoint to a local file, downloading on first use.
fn checkpoint_path() -> Result<PathBuf, TtsError> {
    let api =
        Api::new().map_err(|e| TtsError::InitError(format!("HuggingFace API error: {}", e)))?;
    api.model(CKPT_REPO.to_string())
        .get(CKPT_FILE)
        .map_err(|e| TtsError::InitError(format!("Failed to fetch {}: {}", CKPT_FILE, e)))
}
