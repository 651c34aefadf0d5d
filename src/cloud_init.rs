//! Cloud-init user-data encoding.
//!
//! A single inline document is base64 encoded as-is. A list of parts is
//! assembled into a `multipart/mixed` message, gzip compressed and then
//! base64 encoded. Parts can be supplied inline or read from a file.

use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::GzEncoder;
use rand::RngCore;

use crate::driver_config::{UserData, UserDataItem};
use crate::error::ProvisionError;
use crate::files;
use crate::secrets::SecretGenerator;

/// Prefix of every generated MIME boundary.
pub const BOUNDARY_PREFIX: &str = "MIMEBOUNDARY_";

/// Number of random lowercase letters appended to [`BOUNDARY_PREFIX`].
pub const BOUNDARY_RANDOM_LENGTH: usize = 20;

/// Encodes configured user-data for embedding in a launch request.
///
/// Returns `None` when nothing is configured or the configured value is
/// empty.
///
/// # Errors
///
/// Returns [`ProvisionError::InvalidUserData`] when a part has neither a
/// path nor inline content and [`ProvisionError::Io`] when a referenced file
/// cannot be read.
pub fn encode_user_data<R: RngCore>(
    user_data: Option<&UserData>,
    secrets: &mut SecretGenerator<R>,
) -> Result<Option<String>, ProvisionError> {
    match user_data {
        None => Ok(None),
        Some(UserData::Inline(text)) if text.is_empty() => Ok(None),
        Some(UserData::Inline(text)) => Ok(Some(STANDARD.encode(text.as_bytes()))),
        Some(UserData::Parts(items)) if items.is_empty() => Ok(None),
        Some(UserData::Parts(items)) => {
            let boundary = new_boundary(secrets);
            let message = render_multipart(items, &boundary)?;
            let compressed = gzip(message.as_bytes())?;
            Ok(Some(STANDARD.encode(compressed)))
        }
    }
}

/// Generates a per-run MIME boundary token.
pub fn new_boundary<R: RngCore>(secrets: &mut SecretGenerator<R>) -> String {
    format!(
        "{BOUNDARY_PREFIX}{}",
        secrets.random_string(BOUNDARY_RANDOM_LENGTH)
    )
}

/// Assembles the uncompressed multi-part message.
///
/// Each part is introduced by `--<boundary>` and the message is closed by
/// `--<boundary>--`.
///
/// # Errors
///
/// See [`encode_user_data`].
pub fn render_multipart(items: &[UserDataItem], boundary: &str) -> Result<String, ProvisionError> {
    let mut lines = vec![
        format!("Content-Type: multipart/mixed; boundary=\"{boundary}\""),
        String::from("MIME-Version: 1.0"),
        String::new(),
    ];

    for (index, item) in items.iter().enumerate() {
        let content = read_part(index, item)?;
        lines.push(format!("--{boundary}"));
        lines.push(format!(
            "Content-Disposition: attachment; filename=\"{}\"",
            item.filename
        ));
        lines.push(String::from("Content-Transfer-Encoding: 7bit"));
        lines.push(format!("Content-Type: text/{}", item.content_type));
        lines.push(String::from("Mime-Version: 1.0"));
        lines.push(String::new());
        let body = content.trim_end_matches('\n');
        if !body.is_empty() {
            lines.push(body.to_owned());
        }
        lines.push(String::new());
    }
    lines.push(format!("--{boundary}--"));

    let mut message = lines.join("\n");
    message.push('\n');
    Ok(message)
}

fn read_part(index: usize, item: &UserDataItem) -> Result<String, ProvisionError> {
    if let Some(path) = &item.path {
        return files::read_to_string(path);
    }
    item.inline
        .clone()
        .ok_or_else(|| ProvisionError::InvalidUserData {
            index,
            filename: item.filename.clone(),
        })
}

fn gzip(payload: &[u8]) -> Result<Vec<u8>, ProvisionError> {
    let compress_error = |err: std::io::Error| ProvisionError::Io {
        path: String::from("<user_data>"),
        message: err.to_string(),
    };
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).map_err(compress_error)?;
    encoder.finish().map_err(compress_error)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use camino::Utf8PathBuf;
    use flate2::read::GzDecoder;
    use tempfile::TempDir;

    fn decode(encoded: &str) -> Vec<u8> {
        STANDARD
            .decode(encoded)
            .unwrap_or_else(|err| panic!("payload should be base64: {err}"))
    }

    fn gunzip(bytes: &[u8]) -> String {
        let mut text = String::new();
        GzDecoder::new(bytes)
            .read_to_string(&mut text)
            .unwrap_or_else(|err| panic!("payload should be gzip: {err}"));
        text
    }

    #[test]
    fn absent_user_data_encodes_to_nothing() {
        let mut secrets = SecretGenerator::seeded(1);
        assert_eq!(encode_user_data(None, &mut secrets).expect("encode"), None);
        let empty = UserData::Parts(Vec::new());
        assert_eq!(
            encode_user_data(Some(&empty), &mut secrets).expect("encode"),
            None
        );
    }

    #[test]
    fn inline_string_round_trips() {
        let mut secrets = SecretGenerator::seeded(1);
        let data = UserData::Inline(String::from("echo hi"));
        let encoded = encode_user_data(Some(&data), &mut secrets)
            .expect("encode")
            .expect("payload");
        assert!(!encoded.contains('\n'));
        assert_eq!(decode(&encoded), b"echo hi");
    }

    #[test]
    fn multipart_has_one_header_block_per_item() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("b.sh");
        std::fs::write(&path, "echo from file\n").expect("write part");
        let path = Utf8PathBuf::from_path_buf(path).expect("utf8 path");
        let items = vec![
            UserDataItem::inline("x-shellscript", "a.sh", "echo hi"),
            UserDataItem::file("x-shellscript", "b.sh", path),
        ];

        let message = render_multipart(&items, "MIMEBOUNDARY_test").expect("render");

        assert!(message.starts_with(
            "Content-Type: multipart/mixed; boundary=\"MIMEBOUNDARY_test\"\nMIME-Version: 1.0\n\n"
        ));
        let lines: Vec<&str> = message.lines().collect();
        let delimiters = lines.iter().filter(|l| **l == "--MIMEBOUNDARY_test").count();
        let closers = lines.iter().filter(|l| **l == "--MIMEBOUNDARY_test--").count();
        assert_eq!(delimiters, 2);
        assert_eq!(closers, 1);
        assert_eq!(lines.last(), Some(&"--MIMEBOUNDARY_test--"));
        assert_eq!(
            message
                .matches("Content-Type: text/x-shellscript\nMime-Version: 1.0\n")
                .count(),
            2
        );
        assert!(message.contains("filename=\"a.sh\"\nContent-Transfer-Encoding: 7bit"));
        assert!(message.contains("filename=\"b.sh\""));
        assert!(message.contains("\n\necho hi\n\n--MIMEBOUNDARY_test\n"));
        assert!(message.contains("\n\necho from file\n\n--MIMEBOUNDARY_test--\n"));
    }

    #[test]
    fn multipart_payload_is_gzip_then_base64() {
        let mut secrets = SecretGenerator::seeded(9);
        let data = UserData::Parts(vec![UserDataItem::inline(
            "cloud-config",
            "init.yml",
            "#cloud-config\npackages: [jq]\n",
        )]);
        let encoded = encode_user_data(Some(&data), &mut secrets)
            .expect("encode")
            .expect("payload");
        assert!(!encoded.contains('\n'));

        let message = gunzip(&decode(&encoded));
        let boundary = message
            .lines()
            .next()
            .and_then(|line| line.split("boundary=\"").nth(1))
            .map(|rest| rest.trim_end_matches('"').to_owned())
            .expect("boundary header");
        assert!(boundary.starts_with(BOUNDARY_PREFIX));
        assert_eq!(boundary.len(), BOUNDARY_PREFIX.len() + BOUNDARY_RANDOM_LENGTH);
        assert!(message.contains("#cloud-config\npackages: [jq]\n\n--"));
    }

    #[test]
    fn item_without_source_is_invalid() {
        let item = UserDataItem {
            content_type: String::from("x-shellscript"),
            filename: String::from("empty.sh"),
            path: None,
            inline: None,
        };
        let err = render_multipart(&[item], "b").expect_err("should fail");
        assert_eq!(
            err,
            ProvisionError::InvalidUserData {
                index: 0,
                filename: String::from("empty.sh")
            }
        );
    }

    #[test]
    fn unreadable_part_is_an_io_error() {
        let item = UserDataItem::file("x-shellscript", "gone.sh", "/nonexistent/kitchen-oci/gone.sh");
        let err = render_multipart(&[item], "b").expect_err("should fail");
        assert!(matches!(err, ProvisionError::Io { .. }), "{err:?}");
    }
}
