//! Dependency tree data structures
//!
//! Words are stored in surface order with 1-based ids; id 0 is the virtual
//! root. Constituent spans, including the discontinuity-aware direct spans
//! used for size measurement, are filled in by [`Tree::compute_spans`].

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Word id: 1-based surface position (0 is the virtual root)
pub type NodeId = usize;

/// Virtual root governor id
pub const ROOT: NodeId = 0;

/// Ordered set of word ids covered by a constituent
pub type Span = BTreeSet<NodeId>;

/// Primary component of a relation label (text before any sub-type delimiter)
///
/// `acl:relcl` → `acl`, `nsubj:pass` → `nsubj`.
pub fn primary_relation(deprel: &str) -> &str {
    deprel
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or(deprel)
}

/// Structural error while assembling a tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("word {word} has head {head} outside the sentence")]
    DanglingHead { word: NodeId, head: NodeId },

    #[error("word id {found} out of sequence (expected {expected})")]
    OutOfSequence { expected: NodeId, found: NodeId },
}

/// A word in a dependency tree
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub id: NodeId,
    pub form: String,
    pub lemma: String,
    pub upos: String,
    pub deprel: String,
    /// Basic governor; `None` when attached to the virtual root
    pub head: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Ids transitively governed (excluded relations left out)
    pub span: Span,
    /// `span` minus the subtrees of descendants reattached higher up
    pub direct_span: Span,
    /// Detached descendants reattached to this word
    pub bastards: BTreeSet<NodeId>,
    /// `children ∪ bastards`
    pub all_kids: BTreeSet<NodeId>,
}

impl Word {
    /// Create a new word with the given attributes
    pub fn new(
        id: NodeId,
        form: &str,
        lemma: &str,
        upos: &str,
        deprel: &str,
        head: Option<NodeId>,
    ) -> Self {
        Self {
            id,
            form: form.to_string(),
            lemma: lemma.to_string(),
            upos: upos.to_string(),
            deprel: deprel.to_string(),
            head: head.filter(|&h| h != ROOT),
            children: Vec::new(),
            span: Span::from([id]),
            direct_span: Span::from([id]),
            bastards: BTreeSet::new(),
            all_kids: BTreeSet::new(),
        }
    }

    /// First positive governor id
    #[inline]
    pub fn governor(&self) -> Option<NodeId> {
        self.head.filter(|&h| h > ROOT)
    }

    /// Primary relation to the governor
    #[inline]
    pub fn relation(&self) -> &str {
        primary_relation(&self.deprel)
    }

    #[inline]
    pub fn char_len(&self) -> usize {
        self.form.chars().count()
    }
}

/// Options for [`Tree::compute_spans`]
#[derive(Debug, Clone, PartialEq)]
pub struct SpanOptions {
    /// Primary relations whose subtrees are left out of their governor's span
    pub excluded_relations: Vec<String>,
    /// Reattach detached descendants and compute direct spans
    pub compute_bastards: bool,
    /// Ceiling on governor-chain climbs
    pub max_climb: usize,
}

impl Default for SpanOptions {
    fn default() -> Self {
        Self {
            excluded_relations: vec!["punct".to_string()],
            compute_bastards: true,
            max_climb: 256,
        }
    }
}

impl SpanOptions {
    fn excludes(&self, word: &Word) -> bool {
        let rel = word.relation();
        self.excluded_relations.iter().any(|r| r == rel)
    }
}

/// A dependency tree (sentence)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    pub words: Vec<Word>,
    pub sentence_text: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl Tree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(sentence_text: Option<String>, metadata: HashMap<String, String>) -> Self {
        Self {
            words: Vec::new(),
            sentence_text,
            metadata,
        }
    }

    /// Build a tree from `(form, upos, head, deprel)` rows with ids `1..=n`
    ///
    /// Spans are not computed.
    pub fn from_rows(rows: &[(&str, &str, NodeId, &str)]) -> Result<Self, TreeError> {
        let mut tree = Tree::new();
        for (i, &(form, upos, head, deprel)) in rows.iter().enumerate() {
            tree.add_word(Word::new(i + 1, form, form, upos, deprel, Some(head)))?;
        }
        tree.link_children()?;
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Append a word; ids must arrive as `1, 2, 3, ...`
    pub fn add_word(&mut self, word: Word) -> Result<NodeId, TreeError> {
        let expected = self.words.len() + 1;
        if word.id != expected {
            return Err(TreeError::OutOfSequence {
                expected,
                found: word.id,
            });
        }
        self.words.push(word);
        Ok(expected)
    }

    /// Get a word by id
    #[inline]
    pub fn word(&self, id: NodeId) -> Option<&Word> {
        id.checked_sub(1).and_then(|i| self.words.get(i))
    }

    #[inline]
    fn word_mut(&mut self, id: NodeId) -> Option<&mut Word> {
        id.checked_sub(1).and_then(|i| self.words.get_mut(i))
    }

    /// Rebuild children lists from governor links
    pub fn link_children(&mut self) -> Result<(), TreeError> {
        let n = self.words.len();
        for word in &mut self.words {
            word.children.clear();
        }
        for i in 0..n {
            let (id, head) = (self.words[i].id, self.words[i].governor());
            if let Some(head) = head {
                let parent = self
                    .word_mut(head)
                    .ok_or(TreeError::DanglingHead { word: id, head })?;
                parent.children.push(id);
            }
        }
        Ok(())
    }

    /// Get the governor of a word
    pub fn parent(&self, id: NodeId) -> Option<&Word> {
        self.word(id)
            .and_then(Word::governor)
            .and_then(|head| self.word(head))
    }

    /// Sentence text, or the forms joined by spaces when there is no `# text`
    pub fn text(&self) -> String {
        match &self.sentence_text {
            Some(text) => text.clone(),
            None => self
                .words
                .iter()
                .map(|w| w.form.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Total character length of the forms in a span
    pub fn char_size(&self, span: &Span) -> usize {
        span.iter()
            .filter_map(|&id| self.word(id))
            .map(Word::char_len)
            .sum()
    }

    /// Compute `span`, `direct_span`, `bastards` and `all_kids` for every word
    ///
    /// Recomputes from scratch, so calling it twice gives the same result.
    pub fn compute_spans(&mut self, options: &SpanOptions) {
        let excluded: Vec<bool> = self.words.iter().map(|w| options.excludes(w)).collect();

        let spans = self.subtree_spans(&excluded);
        for (word, span) in self.words.iter_mut().zip(spans) {
            word.direct_span = span.clone();
            word.span = span;
            word.bastards.clear();
        }

        if options.compute_bastards {
            self.attach_bastards(&excluded, options.max_climb);
        }

        for word in &mut self.words {
            word.all_kids = word
                .children
                .iter()
                .chain(word.bastards.iter())
                .copied()
                .collect();
        }
    }

    /// Post-order span computation; a child still open on the stack (cycle)
    /// contributes nothing
    fn subtree_spans(&self, excluded: &[bool]) -> Vec<Span> {
        #[derive(Clone, Copy, PartialEq)]
        enum Visit {
            New,
            Open,
            Done,
        }

        let n = self.words.len();
        let mut state = vec![Visit::New; n];
        let mut spans: Vec<Span> = (1..=n).map(|id| Span::from([id])).collect();

        for start in 0..n {
            if state[start] != Visit::New {
                continue;
            }
            let mut stack = vec![(start, false)];
            while let Some((idx, expanded)) = stack.pop() {
                if expanded {
                    let mut span = Span::from([idx + 1]);
                    for k in self.child_indices(idx) {
                        if !excluded[k] && state[k] == Visit::Done {
                            span.extend(spans[k].iter().copied());
                        }
                    }
                    spans[idx] = span;
                    state[idx] = Visit::Done;
                } else if state[idx] == Visit::New {
                    state[idx] = Visit::Open;
                    stack.push((idx, true));
                    for k in self.child_indices(idx) {
                        if state[k] == Visit::New {
                            stack.push((k, false));
                        }
                    }
                }
            }
        }

        spans
    }

    /// Vector indices of a word's children; children outside the sentence are ignored
    fn child_indices(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let n = self.words.len();
        self.words[idx]
            .children
            .iter()
            .filter_map(move |&kid| kid.checked_sub(1).filter(|&k| k < n))
    }

    fn attach_bastards(&mut self, excluded: &[bool], max_climb: usize) {
        // ids belonging to the root constituent(s); excluded material never opens a gap
        let mut covered = vec![false; self.words.len() + 1];
        for (idx, word) in self.words.iter().enumerate() {
            if word.governor().is_none() && !excluded[idx] {
                for &id in &word.span {
                    if let Some(slot) = covered.get_mut(id) {
                        *slot = true;
                    }
                }
            }
        }

        let mut reattached = Vec::new();
        for (idx, word) in self.words.iter().enumerate() {
            let id = idx + 1;
            if excluded[idx] {
                continue;
            }
            let Some(gov) = word.governor() else {
                continue;
            };
            let Some(governor) = self.word(gov) else {
                tracing::trace!(word = id, head = gov, "governor outside the sentence");
                continue;
            };
            let first = word.span.first().copied().unwrap_or(id);
            let last = word.span.last().copied().unwrap_or(id);
            let (lo, hi) = (first.min(gov), last.max(gov));

            if !has_gap(&covered, lo, hi, &governor.span) {
                continue;
            }

            let mut path = vec![gov];
            let mut current = governor;
            let mut landing = None;
            for _ in 0..max_climb {
                let Some((next, above)) = current
                    .governor()
                    .and_then(|next| self.word(next).map(|w| (next, w)))
                else {
                    break;
                };
                if !has_gap(&covered, lo, hi, &above.span) {
                    landing = Some(next);
                    break;
                }
                path.push(next);
                current = above;
            }

            match landing {
                Some(ancestor) => reattached.push((id, ancestor, path)),
                None => tracing::trace!(word = id, "detached word has no covering ancestor"),
            }
        }

        for (kid, ancestor, path) in reattached {
            let Some(kid_span) = self.word(kid).map(|w| w.span.clone()) else {
                continue;
            };
            for p in path {
                if let Some(word) = self.word_mut(p) {
                    word.direct_span.retain(|id| !kid_span.contains(id));
                }
            }
            if let Some(word) = self.word_mut(ancestor) {
                word.bastards.insert(kid);
            }
        }
    }
}

/// Whether `[lo, hi]` holds a root-constituent id that `cover` does not contain
fn has_gap(covered: &[bool], lo: NodeId, hi: NodeId, cover: &Span) -> bool {
    (lo..=hi).any(|id| covered.get(id).copied().unwrap_or(false) && !cover.contains(&id))
}
