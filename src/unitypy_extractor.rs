//! UnityPy-backed asset extractor
//!
//! Decodes Unity asset files by spawning a Python subprocess that drives the
//! UnityPy library. Payloads are written into a staging directory and described
//! by a JSON document printed between markers on stdout.

use crate::category::CategorySet;
use crate::error::RipperError;
use crate::extractor::{AssetBackend, BackendExport};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

const JSON_START: &str = "<<<UNITY_RIPPER_JSON_START>>>";
const JSON_END: &str = "<<<UNITY_RIPPER_JSON_END>>>";

/// Extractor that shells out to Python + UnityPy
pub struct UnityPyExtractor {
    python: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ProbeInfo {
    unitypy_version: String,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(default)]
    unity_version: Option<String>,
    #[serde(default)]
    load_error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExportInfo {
    #[serde(default)]
    load_error: Option<String>,
    #[serde(flatten)]
    export: BackendExport,
}

impl UnityPyExtractor {
    /// Create a new extractor, locating the Python interpreter.
    ///
    /// `python` may be a bare program name (looked up in PATH) or a path.
    pub fn new(python: Option<&Path>) -> Result<Self> {
        let program = python.unwrap_or_else(|| Path::new("python3"));
        let python = which::which(program).map_err(|e| {
            RipperError::BackendUnavailable(format!(
                "{} not found ({}). Make sure Python 3 is installed or pass --python.",
                program.display(),
                e
            ))
        })?;
        debug!("Using Python interpreter {}", python.display());
        Ok(Self { python })
    }

    /// Verify that UnityPy can be imported, returning its version.
    pub fn check_available(&self) -> Result<String> {
        let info: ProbeInfo = self.run_helper(&[OsStr::new("probe")]).map_err(|e| {
            RipperError::BackendUnavailable(format!(
                "UnityPy could not be imported by {} ({:#}). Install it with `pip install UnityPy`.",
                self.python.display(),
                e
            ))
        })?;
        Ok(info.unitypy_version)
    }

    /// Paths are passed through as `OsStr` so non-UTF-8 names survive.
    fn helper_command(&self, args: &[&OsStr]) -> Command {
        let mut command = Command::new(&self.python);
        command.arg("-c").arg(HELPER_SCRIPT).args(args);
        command
    }

    /// Run the helper script in the given mode and parse its JSON output.
    fn run_helper<T: DeserializeOwned>(&self, args: &[&OsStr]) -> Result<T> {
        let output = self
            .helper_command(args)
            .output()
            .with_context(|| format!("Failed to execute {}", self.python.display()))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("UnityPy helper stderr:\n{}", stderr.trim_end());
        }

        if !output.status.success() {
            anyhow::bail!("UnityPy helper exited with {}: {}", output.status, stderr.trim());
        }

        parse_marked_json(&String::from_utf8_lossy(&output.stdout))
    }
}

impl AssetBackend for UnityPyExtractor {
    fn name(&self) -> &str {
        "UnityPy"
    }

    fn export(
        &self,
        source: &Path,
        categories: &CategorySet,
        staging: &Path,
    ) -> Result<BackendExport> {
        let classes = categories.class_names().join(",");
        let info: ExportInfo = self.run_helper(&[
            OsStr::new("export"),
            source.as_os_str(),
            staging.as_os_str(),
            OsStr::new(&classes),
        ])?;
        if let Some(message) = info.load_error {
            return Err(RipperError::BackendFailed {
                backend: self.name().to_string(),
                path: source.to_path_buf(),
                message,
            }
            .into());
        }
        Ok(info.export)
    }

    fn unity_version(&self, source: &Path) -> Result<Option<String>> {
        let info: VersionInfo =
            self.run_helper(&[OsStr::new("version"), source.as_os_str()])?;
        if let Some(message) = info.load_error {
            return Err(RipperError::BackendFailed {
                backend: self.name().to_string(),
                path: source.to_path_buf(),
                message,
            }
            .into());
        }
        Ok(info.unity_version.filter(|v| !v.is_empty()))
    }
}

/// Extract and parse the JSON document printed between the helper's markers.
fn parse_marked_json<T: DeserializeOwned>(stdout: &str) -> Result<T> {
    let json_start = stdout
        .find(JSON_START)
        .ok_or_else(|| RipperError::Protocol("could not find JSON start marker".to_string()))?;
    // Asset names are echoed inside the document, so the last end marker is the real one.
    let json_end = stdout
        .rfind(JSON_END)
        .ok_or_else(|| RipperError::Protocol("could not find JSON end marker".to_string()))?;

    let body_start = json_start + JSON_START.len();
    if json_end < body_start {
        return Err(RipperError::Protocol("JSON markers out of order".to_string()).into());
    }

    let json_str = &stdout[body_start..json_end];
    serde_json::from_str(json_str).with_context(|| {
        format!(
            "Failed to parse UnityPy helper JSON. Raw output length: {} bytes",
            json_str.len()
        )
    })
}

/// Python helper run with `python -c`. Modes:
///   probe
///   version <source>
///   export <source> <staging-dir> <Class,Class,...>
const HELPER_SCRIPT: &str = r#"
import json
import os
import sys
import traceback

START = "<<<UNITY_RIPPER_JSON_START>>>"
END = "<<<UNITY_RIPPER_JSON_END>>>"

def emit(payload):
    sys.stdout.write(START + json.dumps(payload) + END + "\n")
    sys.stdout.flush()

def json_default(value):
    if isinstance(value, (bytes, bytearray)):
        return bytes(value).hex()
    return str(value)

def as_bytes(value):
    if isinstance(value, (bytes, bytearray, memoryview)):
        return bytes(value)
    if isinstance(value, str):
        return value.encode("utf-8", "surrogateescape")
    return None

def display_name(data):
    for attr in ("m_Name", "name"):
        value = getattr(data, attr, None)
        if value:
            return str(value)
    return None

def env_version(env):
    version = getattr(env, "version", None)
    if version:
        return str(version)
    for obj in env.objects:
        assets_file = getattr(obj, "assets_file", None)
        version = getattr(assets_file, "unity_version", None)
        if version:
            return str(version)
    return None

class Stage:
    def __init__(self, root):
        self.root = root
        self.count = 0
        self.objects = []

    def _reserve(self, fmt):
        self.count += 1
        return "%06d.%s" % (self.count, fmt)

    def _record(self, obj, name, rel, fmt):
        self.objects.append({
            "class": obj.type.name,
            "path_id": obj.path_id,
            "name": name,
            "file": rel,
            "format": fmt,
        })

    def image(self, obj, name, image):
        rel = self._reserve("png")
        image.save(os.path.join(self.root, rel))
        self._record(obj, name, rel, "png")

    def raw(self, obj, name, fmt, payload):
        rel = self._reserve(fmt)
        with open(os.path.join(self.root, rel), "wb") as f:
            f.write(payload)
        self._record(obj, name, rel, fmt)

    def tree(self, obj, name, tree):
        text = json.dumps(tree, indent=2, ensure_ascii=False, default=json_default)
        self.raw(obj, name, "json", text.encode("utf-8"))

def export_object(stage, obj, tname):
    data = obj.read()
    name = display_name(data)

    if tname in ("Texture2D", "Sprite"):
        image = getattr(data, "image", None)
        if image is not None:
            stage.image(obj, name, image)
    elif tname == "AudioClip":
        samples = getattr(data, "samples", None) or {}
        for sample_name, payload in samples.items():
            stage.raw(obj, sample_name or name, "wav", as_bytes(payload))
    elif tname == "Mesh":
        stage.raw(obj, name, "obj", data.export().encode("utf-8"))
    elif tname == "TextAsset":
        payload = None
        for attr in ("m_Script", "script", "text"):
            payload = as_bytes(getattr(data, attr, None))
            if payload:
                break
        if payload is not None:
            stage.raw(obj, name, "text", payload)
    elif tname == "Font":
        payload = as_bytes(getattr(data, "m_FontData", None))
        if payload:
            stage.raw(obj, name, "font", payload)
    elif tname in ("MonoBehaviour", "MonoScript"):
        payload = as_bytes(getattr(data, "m_Script", None) or getattr(data, "script", None))
        if payload:
            stage.raw(obj, name, "text", payload)
        else:
            tree = obj.read_typetree()
            if tree:
                stage.tree(obj, name, tree)
    elif tname == "Material":
        tree = obj.read_typetree()
        if tree:
            stage.tree(obj, name, tree)

def main(argv):
    mode = argv[0]
    if mode == "probe":
        import UnityPy
        emit({"unitypy_version": str(getattr(UnityPy, "__version__", "unknown"))})
        return

    import UnityPy
    try:
        env = UnityPy.load(argv[1])
    except Exception as e:
        emit({"load_error": "%s: %s" % (type(e).__name__, e)})
        return

    if mode == "version":
        emit({"unity_version": env_version(env)})
        return

    stage = Stage(argv[2])
    wanted = set(c for c in argv[3].split(",") if c)
    skipped = {}
    errors = []
    for obj in env.objects:
        tname = getattr(obj.type, "name", str(obj.type))
        if tname not in wanted:
            skipped[tname] = skipped.get(tname, 0) + 1
            continue
        try:
            export_object(stage, obj, tname)
        except Exception as e:
            traceback.print_exc(file=sys.stderr)
            errors.append({"class": tname, "path_id": obj.path_id, "message": "%s: %s" % (type(e).__name__, e)})

    emit({
        "unity_version": env_version(env),
        "objects": stage.objects,
        "skipped": skipped,
        "errors": errors,
    })

main(sys.argv[1:])
"#;
