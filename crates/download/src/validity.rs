//! The validity test shared by every strategy (§4.4): a candidate payload
//! either looks like a known video container, or is large enough that the
//! absence of HTML markers is convincing on its own.

const MIN_BYTES: usize = 10 * 1024;
const LARGE_ENOUGH_BYTES: usize = 500 * 1024;

const HTML_MARKERS: &[&str] = &["<!doctype", "<html", "cloudflare", "login"];

pub fn is_valid_video(bytes: &[u8]) -> bool {
    if bytes.len() < MIN_BYTES {
        return false;
    }
    if has_container_signature(bytes) {
        return true;
    }
    bytes.len() >= LARGE_ENOUGH_BYTES && !looks_like_html_bytes(bytes)
}

/// Checks the payload's head for HTML markers regardless of size, so a
/// small login-page response can still be told apart from a merely
/// too-small (but otherwise unidentifiable) candidate.
pub fn looks_like_html_bytes(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(500)];
    let head_lower = String::from_utf8_lossy(head).to_ascii_lowercase();
    HTML_MARKERS.iter().any(|marker| head_lower.contains(marker))
}

fn has_container_signature(bytes: &[u8]) -> bool {
    // MP4/MOV: "ftyp" at offset 4, or MOV's "moov" atom anywhere in the header.
    if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
        return true;
    }
    if bytes.len() >= 8 && &bytes[4..8] == b"moov" {
        return true;
    }
    // WebM/Matroska: EBML header.
    if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return true;
    }
    false
}

pub fn looks_like_html(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accepts_mp4_signature() {
        let mut bytes = vec![0u8; 4];
        bytes.extend_from_slice(b"ftyp");
        bytes.extend(std::iter::repeat(0u8).take(MIN_BYTES));
        assert!(is_valid_video(&bytes));
    }

    #[test]
    fn rejects_small_payload() {
        let mut bytes = vec![0u8; 4];
        bytes.extend_from_slice(b"ftyp");
        assert!(!is_valid_video(&bytes));
    }

    #[test]
    fn rejects_html_masquerading_as_large_payload() {
        let mut bytes = b"<!doctype html><html>".to_vec();
        bytes.extend(std::iter::repeat(b' ').take(LARGE_ENOUGH_BYTES));
        assert!(!is_valid_video(&bytes));
    }

    #[test]
    fn detects_html_in_a_small_payload() {
        let bytes = b"<!doctype html><html><body>login</body></html>".to_vec();
        assert!(looks_like_html_bytes(&bytes));
        assert!(!is_valid_video(&bytes));
    }

    #[test]
    fn accepts_large_payload_without_html_markers() {
        let bytes = vec![0x42u8; LARGE_ENOUGH_BYTES + 10];
        assert!(is_valid_video(&bytes));
    }
}
