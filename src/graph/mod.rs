//! Flattening of graph-shaped reports
//!
//! A graph report links phenotypes, sequence regions and sequence variants
//! through id lists. Flattening emits one record per region found resistant:
//! - presence pass: one gene-presence record per region referenced by a
//!   resistant phenotype
//! - variant pass: one collapsed mutation record per region carrying variants
//!   linked to a resistant phenotype
//!
//! An id that resolves to nothing only costs the record it would have
//! produced.

pub mod model;

use std::collections::HashMap;
use std::io::Read;
use std::iter::FusedIterator;

use log::{debug, info, warn};
use serde_json::Value;

use crate::error::{HamronizeError, Result};
use crate::metadata::MetadataContext;
use crate::record::{AMINO_ACID_VARIANT, GENE_PRESENCE, NUCLEOTIDE_VARIANT, Record, RecordBuilder};

pub use model::{Database, Phenotype, Region, ResultGraph, Variant};

/// Metadata a graph report must end up with once its own facts are merged
const VERSION_KEYS: [&str; 2] = ["analysis_software_version", "reference_database_version"];

/// Records of one flattened graph and what was left out
#[derive(Debug, Default)]
pub struct Flattened {
    pub records: Vec<Record>,
    /// Records lost to unresolved references or missing mandatory values
    pub skipped: usize,
    /// Phenotypes not flagged resistant
    pub not_resistant: usize,
    /// Fatal fault that stopped flattening; `records` holds what came before
    pub fault: Option<HamronizeError>,
}

impl Flattened {
    /// Keep a built record, or count a record-level fault
    fn emit(&mut self, built: Result<Record>) -> Result<()> {
        match built {
            Ok(record) => self.records.push(record),
            Err(e) if e.is_record_level() => {
                warn!("Skipping graph record: {}", e);
                self.skipped += 1;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Records in order, then the fault that ended flattening (if any)
    fn into_items(self) -> Vec<Result<Record>> {
        let mut items: Vec<Result<Record>> = self.records.into_iter().map(Ok).collect();
        items.extend(self.fault.map(Err));
        items
    }

    fn unresolved(&mut self, kind: &str, id: &str, from: &str) {
        warn!("Skipping graph record: {} '{}' referenced by '{}' not found", kind, id, from);
        self.skipped += 1;
    }
}

struct Index<'a> {
    regions: HashMap<&'a str, &'a Region>,
    variants: HashMap<&'a str, &'a Variant>,
    phenotypes: HashMap<&'a str, &'a Phenotype>,
}

impl<'a> Index<'a> {
    fn new(graph: &'a ResultGraph) -> Self {
        Self {
            regions: graph.seq_regions.iter().map(|(id, r)| (id.as_str(), r)).collect(),
            variants: graph.seq_variations.iter().map(|(id, v)| (id.as_str(), v)).collect(),
            phenotypes: graph.phenotypes.iter().map(|(id, p)| (id.as_str(), p)).collect(),
        }
    }
}

/// Region ids in first-encounter order, each with the items collected for it
struct Groups<'a, T> {
    order: Vec<(&'a str, Vec<T>)>,
    position: HashMap<&'a str, usize>,
}

impl<'a, T: PartialEq> Groups<'a, T> {
    fn new() -> Self {
        Self { order: Vec::new(), position: HashMap::new() }
    }

    fn add(&mut self, region: &'a str, item: T) {
        let idx = *self.position.entry(region).or_insert_with(|| {
            self.order.push((region, Vec::new()));
            self.order.len() - 1
        });
        let items = &mut self.order[idx].1;
        if !items.contains(&item) {
            items.push(item);
        }
    }
}

/// Flatten a graph into canonical records
pub fn flatten(graph: &ResultGraph, metadata: &MetadataContext) -> Flattened {
    let index = Index::new(graph);
    let mut out = Flattened::default();

    let resistant: Vec<(&str, &Phenotype)> = graph
        .phenotypes
        .iter()
        .filter(|(_, p)| p.amr_resistant)
        .map(|(id, p)| (id.as_str(), p))
        .collect();
    out.not_resistant = graph.phenotypes.len() - resistant.len();

    let passes = presence_pass(&resistant, &index, metadata, &mut out)
        .and_then(|()| variant_pass(graph, &resistant, &index, metadata, &mut out));
    if let Err(e) = passes {
        out.fault = Some(e);
    }

    debug!(
        "Flattened {} regions, {} variants, {} phenotypes into {} records",
        graph.seq_regions.len(),
        graph.seq_variations.len(),
        graph.phenotypes.len(),
        out.records.len()
    );
    out
}

fn presence_pass(
    resistant: &[(&str, &Phenotype)],
    index: &Index<'_>,
    metadata: &MetadataContext,
    out: &mut Flattened,
) -> Result<()> {
    let mut groups: Groups<'_, (&str, &Phenotype)> = Groups::new();
    for &(pid, phenotype) in resistant {
        for rid in &phenotype.seq_regions {
            groups.add(rid, (pid, phenotype));
        }
    }

    for (rid, phenotypes) in groups.order {
        let Some(region) = index.regions.get(rid) else {
            out.unresolved("region", rid, phenotypes[0].0);
            continue;
        };

        let mut classes = Vec::new();
        let mut agents = Vec::new();
        for (pid, phenotype) in &phenotypes {
            for class in &phenotype.amr_classes {
                push_unique(&mut classes, class);
            }
            push_unique(&mut agents, phenotype.name(pid));
        }

        let mut builder = region_builder(metadata, rid, region)?;
        builder
            .set("drug_class", joined(&classes))?
            .set("antimicrobial_agent", joined(&agents))?
            .set("genetic_variation_type", GENE_PRESENCE)?;
        out.emit(builder.build())?;
    }
    Ok(())
}

fn variant_pass(
    graph: &ResultGraph,
    resistant: &[(&str, &Phenotype)],
    index: &Index<'_>,
    metadata: &MetadataContext,
    out: &mut Flattened,
) -> Result<()> {
    // region id -> variant ids, plus the resistant phenotypes that led there
    let mut variants: Groups<'_, &str> = Groups::new();
    let mut sources: Groups<'_, &str> = Groups::new();

    for &(pid, phenotype) in resistant {
        for vid in &phenotype.seq_variations {
            let Some(variant) = index.variants.get(vid.as_str()) else {
                out.unresolved("variant", vid, pid);
                continue;
            };
            for rid in &variant.seq_regions {
                variants.add(rid, vid);
                sources.add(rid, pid);
            }
        }
        for rid in &phenotype.seq_regions {
            for (vid, variant) in &graph.seq_variations {
                if variant.seq_regions.contains(rid) {
                    variants.add(rid, vid);
                    sources.add(rid, pid);
                }
            }
        }
    }

    let sources: HashMap<&str, Vec<&str>> = sources.order.into_iter().collect();
    for (rid, vids) in variants.order {
        let phenotype_ids = sources.get(rid).map(Vec::as_slice).unwrap_or_default();
        match collapse(rid, &vids, phenotype_ids, index, metadata) {
            Ok(built) => out.emit(built)?,
            Err(e) if e.is_record_level() => {
                warn!("Skipping graph record: {}", e);
                out.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Collapse every variant found on one region into a single record
fn collapse(
    rid: &str,
    vids: &[&str],
    phenotype_ids: &[&str],
    index: &Index<'_>,
    metadata: &MetadataContext,
) -> Result<Result<Record>> {
    let region = index
        .regions
        .get(rid)
        .ok_or_else(|| unresolved("region", rid, vids[0]))?;

    let mut found: Vec<(&str, &Variant)> = Vec::with_capacity(vids.len());
    for &vid in vids {
        let variant = index
            .variants
            .get(vid)
            .copied()
            .ok_or_else(|| unresolved("variant", vid, rid))?;
        found.push((vid, variant));
    }
    found.sort_by(|(a_id, a), (b_id, b)| {
        a.ref_start_pos.cmp(&b.ref_start_pos).then_with(|| a_id.cmp(b_id))
    });

    let mut amino_acid = Vec::new();
    let mut nucleotide = Vec::new();
    let mut names = Vec::new();
    let mut classes = Vec::new();
    let mut evidence = Vec::new();

    let mut add_phenotype = |pid: &str| -> Result<()> {
        let phenotype = index
            .phenotypes
            .get(pid)
            .ok_or_else(|| unresolved("phenotype", pid, rid))?;
        if phenotype.amr_resistant {
            push_unique(&mut names, phenotype.name(pid));
            for class in &phenotype.amr_classes {
                push_unique(&mut classes, class);
            }
        }
        Ok(())
    };

    for pid in phenotype_ids {
        add_phenotype(pid)?;
    }
    for (vid, variant) in &found {
        for pid in &variant.phenotypes {
            add_phenotype(pid)?;
        }
        let change = variant
            .seq_var
            .as_deref()
            .or(variant.nuc_change.as_deref())
            .ok_or_else(|| {
                HamronizeError::SourceFormat(format!("variant '{}' has no change string", vid))
            })?;
        if change.starts_with("p.") {
            push_unique(&mut amino_acid, change);
        } else {
            push_unique(&mut nucleotide, change);
        }
        for note in variant.notes.iter().chain(&variant.pmids) {
            push_unique(&mut evidence, note);
        }
    }

    let variation_type = if amino_acid.is_empty() {
        NUCLEOTIDE_VARIANT
    } else {
        AMINO_ACID_VARIANT
    };

    let mut builder = region_builder(metadata, rid, region)?;
    builder
        .set("amino_acid_mutation", joined(&amino_acid))?
        .set("nucleotide_mutation", joined(&nucleotide))?
        .set("predicted_phenotype", joined(&names))?
        .set("predicted_phenotype_confidence_level", joined(&evidence))?
        .set("drug_class", joined(&classes))?
        .set("genetic_variation_type", variation_type)?;
    Ok(builder.build())
}

/// Fresh builder carrying the metadata context and the region's attributes
fn region_builder(metadata: &MetadataContext, rid: &str, region: &Region) -> Result<RecordBuilder> {
    let name = region.name.as_deref().unwrap_or(rid);
    let accession = region.ref_acc.as_deref().or(region.ref_id.as_deref());

    let (start, stop, strand) = match (region.query_start_pos, region.query_end_pos) {
        (Some(a), Some(b)) => (
            Value::from(a.min(b)),
            Value::from(a.max(b)),
            Value::from(if a <= b { "+" } else { "-" }),
        ),
        _ => (Value::Null, Value::Null, Value::Null),
    };

    let mut builder = RecordBuilder::from_metadata(metadata);
    builder
        .set("gene_symbol", name)?
        .set("gene_name", name)?
        .set("reference_accession", accession)?
        .set("input_sequence_id", region.query_id.as_deref())?
        .set("input_gene_start", start)?
        .set("input_gene_stop", stop)?
        .set("strand_orientation", strand)?
        .set("input_gene_length", region.alignment_length)?
        .set("reference_gene_start", region.ref_start_pos)?
        .set("reference_gene_stop", region.ref_end_pos)?
        .set("reference_gene_length", region.ref_seq_length)?
        .set("coverage_percentage", region.coverage.map(|c| round_to(c, 1)))?
        .set("coverage_ratio", region.coverage.map(|c| c / 100.0))?
        .set("sequence_identity", region.identity.map(|i| round_to(i, 2)))?;
    Ok(builder)
}

fn unresolved(kind: &str, id: &str, from: &str) -> HamronizeError {
    HamronizeError::SourceFormat(format!("{} '{}' referenced by '{}' not found", kind, id, from))
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|x| x == item) {
        list.push(item.to_string());
    }
}

/// Comma-joined list, null when empty
fn joined(items: &[String]) -> Value {
    if items.is_empty() {
        Value::Null
    } else {
        Value::String(items.join(", "))
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Record sequence of a graph report.
///
/// The report is read and released when the adapter is created; records are
/// then handed out one at a time.
pub struct GraphAdapter {
    items: std::vec::IntoIter<Result<Record>>,
}

impl GraphAdapter {
    pub fn new<R: Read>(tool: &str, mut input: R, metadata: MetadataContext) -> Result<Self> {
        let mut content = String::new();
        input.read_to_string(&mut content)?;
        drop(input);

        if content.trim().is_empty() {
            warn!("{}: report contains no results", tool);
            return Ok(Self { items: Vec::new().into_iter() });
        }

        let graph: ResultGraph = serde_json::from_str(&content)?;
        let metadata = metadata.with_defaults(&graph.facts());
        metadata.require(tool, &VERSION_KEYS)?;

        let flat = flatten(&graph, &metadata);
        if flat.skipped > 0 {
            warn!("{}: skipped {} records with unresolved references", tool, flat.skipped);
        }
        if flat.not_resistant > 0 {
            warn!("{}: dropped {} phenotypes not flagged resistant", tool, flat.not_resistant);
        }
        info!("{}: {} records from graph", tool, flat.records.len());
        Ok(Self {
            items: flat.into_items().into_iter(),
        })
    }
}

impl Iterator for GraphAdapter {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }
}

impl FusedIterator for GraphAdapter {}
