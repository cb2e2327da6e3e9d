//! The fixed content catalog.
//!
//! Items are created once from a seed list and never mutated. The content
//! hash covers every field that feeds an embedding, so a changed catalog
//! produces a different hash and persisted vectors can be recognised as stale.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::types::{CatalogItem, ContentKind, Difficulty};

#[derive(Debug, Clone)]
pub struct CatalogIndex {
    items: Vec<CatalogItem>,
}

impl CatalogIndex {
    /// The built-in learning catalog.
    pub fn seeded() -> Self { Self { items: seed_items() } }

    pub fn from_items(items: Vec<CatalogItem>) -> Result<Self> {
        let mut seen = HashSet::new();
        for item in &items {
            if item.id.trim().is_empty() {
                return Err(Error::InvalidCatalog(format!("item '{}' has an empty id", item.title)));
            }
            if !seen.insert(item.id.as_str()) {
                return Err(Error::InvalidCatalog(format!("duplicate item id '{}'", item.id)));
            }
        }
        Ok(Self { items })
    }

    pub fn all_items(&self) -> &[CatalogItem] { &self.items }

    pub fn get(&self, id: &str) -> Option<&CatalogItem> { self.items.iter().find(|i| i.id == id) }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// blake3 over `id`, `title` and `body` of every item, in catalog order.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for item in &self.items {
            for field in [&item.id, &item.title, &item.body] {
                hasher.update(&(field.len() as u64).to_le_bytes());
                hasher.update(field.as_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl Default for CatalogIndex {
    fn default() -> Self { Self::seeded() }
}

fn item(
    id: &str,
    title: &str,
    body: &str,
    kind: ContentKind,
    category: Option<&str>,
    difficulty: Option<Difficulty>,
    description: Option<&str>,
) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        kind,
        category: category.map(str::to_string),
        difficulty,
        description: description.map(str::to_string),
    }
}

fn seed_items() -> Vec<CatalogItem> {
    use ContentKind::*;
    use Difficulty::*;
    vec![
        item("track-genetics-101", "Genetics Fundamentals",
             "Start with the building blocks of heredity: DNA, genes, chromosomes and how traits pass from parents to offspring.",
             Track, Some("genetics"), Some(Beginner), Some("A guided path through the basics of heredity.")),
        item("track-bioinformatics", "Bioinformatics with Python",
             "Learn to analyse sequence data, align reads and query biological databases using Python and open tools.",
             Track, Some("bioinformatics"), Some(Intermediate), Some("Hands-on computational biology.")),
        item("track-ai-biology", "AI for Life Sciences",
             "Apply machine learning to protein structure prediction, gene expression analysis and drug discovery.",
             Track, Some("ai"), Some(Advanced), Some("Modern models applied to biological data.")),
        item("lesson-dna-structure", "The Structure of DNA",
             "DNA is a double helix of nucleotides. Base pairing between adenine and thymine, cytosine and guanine stores genetic information.",
             Lesson, Some("genetics"), Some(Beginner), Some("Double helix, nucleotides and base pairing.")),
        item("lesson-gene-expression", "Gene Expression",
             "Genes are transcribed into RNA and translated into proteins. Regulation decides which genes are active in each cell.",
             Lesson, Some("genetics"), Some(Intermediate), Some("From gene to protein.")),
        item("lesson-crispr", "CRISPR Gene Editing",
             "CRISPR-Cas9 uses a guide RNA to cut DNA at a chosen site, enabling precise edits to genes in living organisms.",
             Lesson, Some("genetics"), Some(Advanced), Some("Programmable genome editing.")),
        item("lesson-sequence-alignment", "Sequence Alignment",
             "Alignment algorithms such as Needleman-Wunsch and BLAST compare DNA or protein sequences to find similarity.",
             Lesson, Some("bioinformatics"), Some(Intermediate), Some("Comparing biological sequences.")),
        item("lesson-protein-folding", "Protein Folding",
             "Proteins fold into three-dimensional shapes that determine their function. Misfolding is linked to disease.",
             Lesson, Some("molecular-biology"), Some(Intermediate), None),
        item("lesson-neural-networks", "Neural Networks for Biology",
             "Neural networks learn patterns from large biological datasets, from image-based diagnosis to sequence models.",
             Lesson, Some("ai"), Some(Advanced), None),
        item("term-allele", "Allele",
             "An allele is one of several variant forms of a gene found at the same place on a chromosome.",
             GlossaryTerm, Some("genetics"), None, None),
        item("term-genome", "Genome",
             "The genome is the complete set of DNA of an organism, including all of its genes.",
             GlossaryTerm, Some("genetics"), None, None),
        item("term-mutation", "Mutation",
             "A mutation is a change in a DNA sequence. Mutations can be harmless, harmful or occasionally beneficial.",
             GlossaryTerm, Some("genetics"), None, None),
        item("term-rna", "RNA",
             "Ribonucleic acid carries genetic instructions from DNA to the protein-making machinery of the cell.",
             GlossaryTerm, Some("molecular-biology"), None, None),
        item("news-protein-model", "New Model Predicts Protein Structures",
             "Researchers released an open model that predicts protein structures with near-experimental accuracy.",
             News, Some("ai"), None, Some("Structure prediction reaches a new milestone.")),
        item("news-gene-therapy", "Gene Therapy Approval",
             "Regulators approved a CRISPR-based gene therapy for sickle cell disease, the first of its kind.",
             News, Some("genetics"), None, Some("A first for genome editing in the clinic.")),
    ]
}
