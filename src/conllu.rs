//! CoNLL-U file parsing
//!
//! Reads CoNLL-U sentences into [`Tree`]s. Multiword token ranges and empty
//! nodes are skipped; only the ID, FORM, LEMMA, UPOS, HEAD and DEPREL
//! columns are kept. Files ending in `.gz` are decompressed on the fly.
//!
//! CoNLL-U format: https://universaldependencies.org/format.html

use crate::tree::{NodeId, Tree, Word};
use atoi::FromRadix10Checked;
use flate2::read::MultiGzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Lines};
use std::path::Path;
use thiserror::Error;

/// Error while reading CoNLL-U input
#[derive(Debug, Error)]
pub enum ParseError {
    /// One sentence could not be turned into a tree; the reader can continue
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },

    /// The underlying reader failed; nothing more can be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    fn malformed(line: usize, message: impl Into<String>) -> Self {
        ParseError::Malformed {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenId {
    Single(usize),
    Range(usize, usize),
    Decimal(usize, usize),
}

/// Iterator over the sentences of a CoNLL-U stream
pub struct TreeIterator<R: BufRead> {
    lines: Lines<R>,
    line_num: usize,
    failed: bool,
}

impl<R: BufRead> TreeIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_num: 0,
            failed: false,
        }
    }
}

impl TreeIterator<Box<dyn BufRead + Send>> {
    /// Open a CoNLL-U file (plain or gzip-compressed)
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let reader: Box<dyn BufRead + Send> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self::new(reader))
    }
}

impl TreeIterator<Cursor<String>> {
    pub fn from_string(text: &str) -> Self {
        Self::new(Cursor::new(text.to_string()))
    }
}

impl<R: BufRead> Iterator for TreeIterator<R> {
    type Item = Result<Tree, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let mut tree_lines = Vec::new();
        let mut metadata = HashMap::new();
        let mut sentence_text = None;

        loop {
            match self.lines.next() {
                None => {
                    if tree_lines.is_empty() {
                        return None;
                    }
                    break;
                }
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(ParseError::Io(e)));
                }
                Some(Ok(line)) => {
                    self.line_num += 1;
                    let line = line.trim_end_matches(['\r', '\n']);

                    if line.trim().is_empty() {
                        if !tree_lines.is_empty() {
                            break;
                        }
                        // comments of a block without tokens belong to no sentence
                        metadata.clear();
                        sentence_text = None;
                        continue;
                    }

                    if let Some(comment) = line.strip_prefix('#') {
                        parse_comment(comment, &mut metadata, &mut sentence_text);
                        continue;
                    }

                    tree_lines.push((self.line_num, line.to_string()));
                }
            }
        }

        Some(parse_tree(tree_lines, sentence_text, metadata))
    }
}

fn parse_comment(
    comment: &str,
    metadata: &mut HashMap<String, String>,
    sentence_text: &mut Option<String>,
) {
    if let Some((key, value)) = comment.split_once('=') {
        let (key, value) = (key.trim(), value.trim());
        if key == "text" {
            *sentence_text = Some(value.to_string());
        } else {
            metadata.insert(key.to_string(), value.to_string());
        }
    }
}

fn parse_tree(
    lines: Vec<(usize, String)>,
    sentence_text: Option<String>,
    metadata: HashMap<String, String>,
) -> Result<Tree, ParseError> {
    let first_line = lines.first().map(|(n, _)| *n).unwrap_or(0);
    let mut tree = Tree::with_metadata(sentence_text, metadata);

    for (line_num, line) in lines {
        if let Some(word) = parse_line(&line, line_num)? {
            tree.add_word(word)
                .map_err(|e| ParseError::malformed(line_num, e.to_string()))?;
        }
    }

    if tree.is_empty() {
        return Err(ParseError::malformed(first_line, "sentence has no words"));
    }

    tree.link_children()
        .map_err(|e| ParseError::malformed(first_line, e.to_string()))?;

    Ok(tree)
}

/// Parse a single token line; `None` for multiword ranges and empty nodes
fn parse_line(line: &str, line_num: usize) -> Result<Option<Word>, ParseError> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() != 10 {
        return Err(ParseError::malformed(
            line_num,
            format!("expected 10 fields, found {}", fields.len()),
        ));
    }

    let id = match parse_id(fields[0]) {
        Some(TokenId::Single(id)) => id,
        Some(TokenId::Range(..) | TokenId::Decimal(..)) => return Ok(None),
        None => {
            return Err(ParseError::malformed(
                line_num,
                format!("invalid ID: {}", fields[0]),
            ));
        }
    };

    let form = fields[1];
    let lemma = if fields[2] == "_" { form } else { fields[2] };
    let head = parse_head(fields[6])
        .ok_or_else(|| ParseError::malformed(line_num, format!("invalid HEAD: {}", fields[6])))?;

    Ok(Some(Word::new(id, form, lemma, fields[3], fields[7], head)))
}

fn parse_index(s: &str) -> Option<usize> {
    match usize::from_radix_10_checked(s.as_bytes()) {
        (Some(n), used) if used > 0 && used == s.len() => Some(n),
        _ => None,
    }
}

fn parse_id(s: &str) -> Option<TokenId> {
    if let Some((start, end)) = s.split_once('-') {
        Some(TokenId::Range(parse_index(start)?, parse_index(end)?))
    } else if let Some((main, sub)) = s.split_once('.') {
        Some(TokenId::Decimal(parse_index(main)?, parse_index(sub)?))
    } else {
        parse_index(s).map(TokenId::Single)
    }
}

/// HEAD column: `None` inside the option means attached to the root
fn parse_head(s: &str) -> Option<Option<NodeId>> {
    if s == "_" {
        return Some(None);
    }
    parse_index(s).map(|h| (h > 0).then_some(h))
}
