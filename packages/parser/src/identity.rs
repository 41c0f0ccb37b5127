use crc32fast::Hasher;

/// Generate a document ID from a template name or path using CRC32.
/// Used to namespace persisted state per document.
pub fn document_id(name: &str) -> String {
    let mut buff = String::from(name);
    if !name.starts_with("template://") {
        buff = format!("template://{}", buff);
    }

    let mut hasher = Hasher::new();
    hasher.update(buff.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_generation() {
        let id1 = document_id("templates/report.html");
        let id2 = document_id("templates/report.html");

        // Same name always generates same ID
        assert_eq!(id1, id2);

        // Different names generate different IDs
        let id3 = document_id("templates/poster.html");
        assert_ne!(id1, id3);

        // Scheme prefix is implied
        assert_eq!(id1, document_id("template://templates/report.html"));
    }
}
