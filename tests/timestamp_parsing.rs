use atayal_webui::error::RemoteError;
use atayal_webui::normalize::{
    pronunciation, strip_timestamps, transcript_text, translation_text, EMPTY_TRANSCRIPT,
};

#[test]
fn timestamp_markers_are_removed_and_trimmed() {
    assert_eq!(
        strip_timestamps("[0.00-4.66s] hello [4.66-5.00s] world"),
        "hello world"
    );
    assert_eq!(strip_timestamps("[12.5-13.75s]  lokah"), "lokah");
}

#[test]
fn marker_free_text_is_unchanged() {
    assert_eq!(strip_timestamps("lokah su ga"), "lokah su ga");
    assert_eq!(strip_timestamps("[not a marker] text"), "[not a marker] text");
}

#[test]
fn plain_text_transcript() {
    let body = b"[0.00-1.10s] mhuway su";
    assert_eq!(transcript_text(body).unwrap(), "mhuway su");
}

#[test]
fn json_string_transcript() {
    let body = "\"[0.00-1.00s] 你好\"";
    assert_eq!(transcript_text(body.as_bytes()).unwrap(), "你好");
}

#[test]
fn json_object_transcript_uses_text_field() {
    let body = br#"{"text": "[0.00-0.50s] yutas", "language": "atayal"}"#;
    assert_eq!(transcript_text(body).unwrap(), "yutas");
}

#[test]
fn json_object_without_text_is_stringified() {
    let body = br#"{"segments": []}"#;
    assert_eq!(transcript_text(body).unwrap(), r#"{"segments":[]}"#);
}

#[test]
fn empty_transcript_reports_missing_text() {
    assert_eq!(transcript_text(b"").unwrap(), EMPTY_TRANSCRIPT);
    assert_eq!(transcript_text(br#"{"text": ""}"#).unwrap(), EMPTY_TRANSCRIPT);
    assert_eq!(transcript_text(b"\"\"").unwrap(), EMPTY_TRANSCRIPT);
}

#[test]
fn unreadable_body_is_a_decode_error() {
    let body = [0xff_u8, 0xfe, 0x00, 0x81];
    assert!(matches!(transcript_text(&body), Err(RemoteError::Decode(_))));
    assert!(matches!(
        translation_text(&body, "atayal_text"),
        Err(RemoteError::Decode(_))
    ));
}

#[test]
fn translation_field_is_extracted() {
    let body = br#"{"atayal_text": "lokah su", "reference_id": "req-1"}"#;
    assert_eq!(translation_text(body, "atayal_text").unwrap(), "lokah su");
}

#[test]
fn translation_shape_mismatch_degrades_to_raw_json() {
    let body = br#"{"detail": "model loading"}"#;
    assert_eq!(
        translation_text(body, "chinese_text").unwrap(),
        r#"{"detail":"model loading"}"#
    );

    let body = br#"{"chinese_text": 42}"#;
    assert_eq!(
        translation_text(body, "chinese_text").unwrap(),
        r#"{"chinese_text":42}"#
    );
}

#[test]
fn translation_plain_text_is_trimmed() {
    assert_eq!(
        translation_text(b"  mhuway su \n", "atayal_text").unwrap(),
        "mhuway su"
    );
}

#[test]
fn pronunciation_without_score() {
    let result = pronunciation(br#"{"transcription": "abc"}"#).unwrap();
    assert_eq!(result.transcription, "abc");
    assert_eq!(result.score, None);
    assert_eq!(result.passes(0.75), None);
}

#[test]
fn pronunciation_with_score() {
    let result = pronunciation(br#"{"transcription": "[0.00-0.80s] squliq", "score": 0.6}"#).unwrap();
    assert_eq!(result.transcription, "squliq");
    assert_eq!(result.score, Some(0.6));
    assert_eq!(result.passes(0.75), Some(false));
}

#[test]
fn malformed_score_keeps_transcription() {
    let result = pronunciation(br#"{"transcription": "patas", "score": "n/a"}"#).unwrap();
    assert_eq!(result.transcription, "patas");
    assert_eq!(result.score, None);

    let result = pronunciation(br#"{"score": "0.9"}"#).unwrap();
    assert_eq!(result.transcription, "");
    assert_eq!(result.score, Some(0.9));
}

#[test]
fn pronunciation_plain_text_degrades_to_transcript() {
    let result = pronunciation(b"[0.00-0.40s] mita").unwrap();
    assert_eq!(result.transcription, "mita");
    assert_eq!(result.score, None);
}
