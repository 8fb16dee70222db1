// tests/cli_test.rs
//
// Drives the built binary the way a user would.

mod test_utils;

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use pcmaudit::cli::ReportLine;
use pcmaudit::{AnalysisResult, Check, Severity};
use test_utils::*;

fn write_wav(path: &Path, samples: &[f64], channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for &x in samples {
        writer
            .write_sample((x * 32767.0).round().clamp(-32768.0, 32767.0) as i16)
            .expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

/// Stereo sine with a clipped burst in the middle
fn clipped_tone() -> Vec<f64> {
    let mut tone = sine(440.0, 44100.0, 44100 * 2, 0.5);
    for x in &mut tone[44100..44100 + 500] {
        *x = 1.0;
    }
    interleave(&[tone.clone(), tone])
}

#[test]
fn test_analyze_raw_file_as_json() {
    let path = temp_path("pcm");
    fs::write(&path, encode_ints(&vec![i16::MAX as i32; 44100], 16)).unwrap();

    let output = Command::new(binary_path())
        .args(["analyze", path.to_str().unwrap(), "--channels", "1"])
        .args(["--checks", "clipping,dc-offset", "--format", "json"])
        .output()
        .expect("run pcmaudit");
    fs::remove_file(&path).ok();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let result: AnalysisResult = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(result.issues.len(), 2);
    assert_eq!(result.issue(Check::Clipping).unwrap().severity, Severity::Severe);
    assert_eq!(result.worst_severity(), Severity::Severe);
}

#[test]
fn test_analyze_stdin_markdown() {
    let mut child = Command::new(binary_path())
        .args(["analyze", "-", "--checks", "silence-padding", "--format", "markdown"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn pcmaudit");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(&encode_ints(&vec![0; 44100 * 2 * 3], 16))
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("## <stdin>"));
    assert!(stdout.contains("| silence-padding | severe |"));
}

#[test]
fn test_invalid_format_exits_with_failure() {
    let output = Command::new(binary_path())
        .args(["analyze", "-", "--bit-depth", "20"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_process_wav_container() {
    let path = temp_path("wav");
    write_wav(&path, &clipped_tone(), 2);

    let output = Command::new(binary_path())
        .args(["process", path.to_str().unwrap(), "--checks", "clipping,fake-bit-depth", "--format", "json"])
        .output()
        .unwrap();
    fs::remove_file(&path).ok();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let result: AnalysisResult = serde_json::from_slice(&output.stdout).unwrap();
    assert!(result.issue(Check::Clipping).unwrap().detected);
    assert_eq!(result.raw.clipping.as_ref().unwrap().clipped_samples, 1000);
    assert!(!result.issue(Check::FakeBitDepth).unwrap().detected);
}

#[test]
fn test_report_and_digest() {
    let folder = temp_path("d");
    fs::create_dir_all(folder.join("album")).unwrap();
    write_wav(&folder.join("album/01.wav"), &clipped_tone(), 2);
    write_wav(&folder.join("album/02.wav"), &interleave(&[sine(1000.0, 44100.0, 44100, 0.3)]), 1);
    fs::write(folder.join("album/broken.flac"), b"definitely not flac").unwrap();
    fs::write(folder.join("notes.txt"), b"ignored").unwrap();
    let report = folder.join("report.jsonl");

    let output = Command::new(binary_path())
        .arg("report")
        .arg(&folder)
        .args(["--checks", "clipping", "--workers", "2", "--redact-path", "--output"])
        .arg(&report)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let text = fs::read_to_string(&report).unwrap();
    let lines: Vec<ReportLine> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 3);
    let expected = format!("md5:{:x}.wav", md5::compute(b"album/01.wav"));
    assert_eq!(lines[0].file.as_deref(), Some(expected.as_str()));
    assert!(lines[0].analysis.as_ref().unwrap().issue(Check::Clipping).unwrap().detected);
    assert!(lines[0].timing.is_some());
    assert!(lines[0].probe.is_some());
    assert!(!lines[1].analysis.as_ref().unwrap().issue(Check::Clipping).unwrap().detected);
    let broken = lines.iter().find(|l| l.error.is_some()).expect("error line");
    assert!(broken.analysis.is_none());

    let output = Command::new(binary_path())
        .arg("digest")
        .arg(&report)
        .args(["--issue", "clipping"])
        .output()
        .unwrap();
    fs::remove_dir_all(&folder).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 analyzed, 1 failed"), "{}", stdout);
    assert!(stdout.contains(&expected));
}
