use super::*;

#[test]
fn test_empty_payload_is_missing() {
    assert_eq!(decode_audio(""), Err(PayloadError::Missing));
    assert_eq!(PayloadError::Missing.to_string(), "audio_base64 is required");
}

#[test]
fn test_invalid_base64() {
    assert_eq!(decode_audio("not-base64!!"), Err(PayloadError::InvalidBase64));
    assert_eq!(PayloadError::InvalidBase64.to_string(), "Invalid base64 audio");
}

#[test]
fn test_bad_padding_is_invalid() {
    assert_eq!(decode_audio("UklGRg="), Err(PayloadError::InvalidBase64));
}

#[test]
fn test_plain_payload_decodes() {
    assert_eq!(decode_audio("UklGRg==").unwrap(), b"RIFF");
}

#[test]
fn test_data_uri_prefix_is_discarded() {
    let bare = decode_audio("UklGRiQAAABXQVZF").unwrap();
    let prefixed = decode_audio("data:audio/wav;base64,UklGRiQAAABXQVZF").unwrap();

    assert_eq!(bare, prefixed);
}

#[test]
fn test_only_first_comma_splits() {
    // The remainder after the first comma still has to be valid base64
    assert_eq!(
        decode_audio("a,UklGRg==,x"),
        Err(PayloadError::InvalidBase64)
    );
}

#[test]
fn test_prefix_only_decodes_to_nothing() {
    assert_eq!(decode_audio("data:audio/wav;base64,").unwrap(), Vec::<u8>::new());
}

#[test]
fn test_whitespace_ignored() {
    assert_eq!(decode_audio("UklG\nRg==\r\n").unwrap(), b"RIFF");
}

#[test]
fn test_temp_file_written_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let path;
    {
        let file = TempAudioFile::write(b"RIFF....WAVEdata", Some(dir.path())).unwrap();
        path = file.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFF....WAVEdata");
        assert_eq!(path.extension().unwrap(), "wav");
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("vt-audio-")
        );
    }
    assert!(!path.exists());
}

#[test]
fn test_temp_files_are_unique() {
    let dir = tempfile::tempdir().unwrap();
    let a = TempAudioFile::write(b"a", Some(dir.path())).unwrap();
    let b = TempAudioFile::write(b"b", Some(dir.path())).unwrap();

    assert_ne!(a.path(), b.path());
}

#[test]
fn test_non_wav_bytes_still_use_wav_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let file = TempAudioFile::write(b"OggS", Some(dir.path())).unwrap();

    assert_eq!(file.path().extension().unwrap(), "wav");
}

#[test]
fn test_removed_when_unwinding() {
    let dir = tempfile::tempdir().unwrap();
    let dir_path = dir.path().to_path_buf();

    let result = std::panic::catch_unwind(move || {
        let _file = TempAudioFile::write(b"RIFF", Some(&dir_path)).unwrap();
        panic!("inference blew up");
    });

    assert!(result.is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
