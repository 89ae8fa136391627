//! Drives the binary over stdin/stdout. None of these cases needs a model file.

use base64::Engine as _;
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use std::io::{Cursor, Write};
use std::process::{Command, Output, Stdio};

fn run(input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_pose-landmarks"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn pose-landmarks");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn png_base64() -> String {
    let mut bytes = Vec::new();
    RgbImage::from_pixel(16, 16, Rgb([0, 128, 255]))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    base64::engine::general_purpose::STANDARD.encode(&bytes)
}

#[test]
fn frames_without_images_yield_null_poses() {
    let out = run(r#"{"frames":[{"idx":1},{"idx":"b","base64Image":""},{"base64Image":null}]}"#);
    assert_eq!(out.status.code(), Some(0));
    assert!(out.stderr.is_empty(), "{}", String::from_utf8_lossy(&out.stderr));

    let doc: Value = serde_json::from_slice(&out.stdout).unwrap();
    let frames = doc["frames"].as_array().unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0]["idx"], Value::from(1));
    assert_eq!(frames[1]["idx"], Value::from("b"));
    assert_eq!(frames[2]["idx"], Value::Null);
    for frame in frames {
        let pose = frame["pose"].as_object().unwrap();
        assert_eq!(pose.len(), 12);
        assert!(pose.values().all(Value::is_null));
    }
}

#[test]
fn output_keys_follow_joint_order() {
    let out = run(r#"{"frames":[{"idx":0}]}"#);
    let text = String::from_utf8(out.stdout).unwrap();
    let keys = [
        "leftShoulder", "rightShoulder", "leftElbow", "rightElbow", "leftWrist", "rightWrist",
        "leftHip", "rightHip", "leftKnee", "rightKnee", "leftAnkle", "rightAnkle",
    ];
    let positions: Vec<usize> = keys.iter().map(|k| text.find(k).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(text.ends_with('\n'));
}

#[test]
fn malformed_base64_exits_with_status_one() {
    let out = run(r#"{"frames":[{"idx":1},{"idx":2,"base64Image":"@@not-base64@@"}]}"#);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("invalid base64"), "{}", stderr);
}

#[test]
fn undecodable_image_exits_with_status_one() {
    let out = run(r#"{"frames":[{"idx":1,"base64Image":"aGVsbG8gd29ybGQ="}]}"#);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to decode image"));
}

#[test]
fn invalid_json_exits_with_status_one() {
    let out = run("{\"frames\": [");
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(!out.stderr.is_empty());
}

#[test]
fn missing_model_exits_with_status_one() {
    // models/ is not shipped in the repository
    let input = format!(r#"{{"frames":[{{"idx":1,"base64Image":"{}"}}]}}"#, png_base64());
    let out = run(&input);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to load ONNX model"));
}

#[test]
fn non_object_input_exits_with_status_one() {
    for input in ["[]", r#"{"frames":[[7,"aGVs"]]}"#] {
        let out = run(input);
        assert_eq!(out.status.code(), Some(1), "{}", input);
        assert!(out.stdout.is_empty());
        assert!(String::from_utf8_lossy(&out.stderr).contains("must be a JSON object"));
    }
}

#[test]
fn unpadded_base64_exits_with_status_one() {
    let out = run(r#"{"frames":[{"idx":1,"base64Image":"aGVsbG8"}]}"#);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("invalid base64"));
}
