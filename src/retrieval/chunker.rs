/// 按空白切分单词，以 `chunk_size` 个单词为窗口、相邻窗口重叠 `overlap` 个单词切块
///
/// 步长为 `chunk_size - overlap`，`overlap >= chunk_size` 时步长取1；空白块被丢弃。
pub fn chunk_words(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let window = chunk_size.max(1);
    let step = window.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + window).min(words.len());
        let chunk = words[start..end].join(" ");
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_windows_overlap() {
        let chunks = chunk_words(&words(10), 4, 1);
        assert_eq!(
            chunks,
            vec![
                "w0 w1 w2 w3",
                "w3 w4 w5 w6",
                "w6 w7 w8 w9",
                "w9",
            ]
        );
    }

    #[test]
    fn test_default_window_sizes() {
        let chunks = chunk_words(&words(550), 500, 50);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].starts_with("w450 "));
        assert_eq!(chunks[1].split(' ').count(), 100);
    }

    #[test]
    fn test_blank_text_has_no_chunks() {
        assert!(chunk_words("", 500, 50).is_empty());
        assert!(chunk_words(" \n\t ", 500, 50).is_empty());
    }

    #[test]
    fn test_overlap_not_smaller_than_window_advances_by_one() {
        let chunks = chunk_words("a b c", 2, 5);
        assert_eq!(chunks, vec!["a b", "b c", "c"]);
    }
}
