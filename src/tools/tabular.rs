//! Field maps and row transforms of the tab-delimited tool reports

use csv::StringRecord;

use crate::adapter::field_map::FieldMap;
use crate::adapter::tabular::{Layout, Row, RowAction, TabularHooks};
use crate::error::Result;
use crate::record::{AMINO_ACID_VARIANT, GENE_PRESENCE, NUCLEOTIDE_VARIANT};

const AA_MUTATION: &str = "_amino_acid_mutation";
const NT_MUTATION: &str = "_nucleotide_mutation";
const VARIATION: &str = "_genetic_variation_type";

/// Split a point mutation such as `S83L` or `G2032T` into (ref, position, alt)
fn split_point_mutation(mutation: &str) -> Option<(&str, &str, &str)> {
    let pos_start = mutation.find(|c: char| c.is_ascii_digit())?;
    let pos_len = mutation[pos_start..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(mutation.len() - pos_start);
    let (reference, rest) = mutation.split_at(pos_start);
    let (position, alt) = rest.split_at(pos_len);
    if reference.is_empty() || alt.is_empty() || alt.contains(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some((reference, position, alt))
}

// ============================================================================
// abricate
// ============================================================================

fn abricate_map(_: &[String], _: Option<&StringRecord>) -> FieldMap {
    FieldMap::new(&[
        ("#FILE", Some("input_file_name")),
        ("SEQUENCE", Some("input_sequence_id")),
        ("START", Some("input_gene_start")),
        ("END", Some("input_gene_stop")),
        ("STRAND", Some("strand_orientation")),
        ("GENE", Some("gene_symbol")),
        ("PRODUCT", Some("gene_name")),
        ("%COVERAGE", Some("coverage_percentage")),
        ("COVERAGE", None),
        ("%IDENTITY", Some("sequence_identity")),
        ("DATABASE", Some("reference_database_name")),
        ("ACCESSION", Some("reference_accession")),
        ("RESISTANCE", Some("drug_class")),
        ("COVERAGE_MAP", None),
        ("GAPS", None),
    ])
}

pub(super) const ABRICATE: TabularHooks = TabularHooks {
    select: abricate_map,
    transform: None,
    columns: None,
    layout: Layout::Tabs,
};

// ============================================================================
// amrfinderplus
// ============================================================================

const AMRFINDER_SHARED: [(&str, Option<&str>); 17] = [
    ("Gene symbol", Some("gene_symbol")),
    ("Sequence name", Some("gene_name")),
    ("Scope", None),
    ("Element subtype", None),
    ("Class", Some("drug_class")),
    ("Subclass", Some("antimicrobial_agent")),
    ("Method", None),
    ("Target length", Some("input_protein_length")),
    ("Reference sequence length", Some("reference_protein_length")),
    ("% Coverage of reference sequence", Some("coverage_percentage")),
    ("% Identity to reference sequence", Some("sequence_identity")),
    ("Alignment length", None),
    ("Accession of closest sequence", Some("reference_accession")),
    ("Name of closest sequence", None),
    ("HMM id", None),
    ("HMM description", None),
    (VARIATION, Some("genetic_variation_type")),
];

/// Nucleotide runs leave the protein identifier as `NA`
fn amrfinderplus_map(_: &[String], first_row: Option<&StringRecord>) -> FieldMap {
    let nucleotide = first_row.and_then(|r| r.get(0)).is_none_or(|c| c.trim() == "NA");
    let mut map = if nucleotide {
        FieldMap::new(&[
            ("Protein identifier", None),
            ("Contig id", Some("input_sequence_id")),
            ("Start", Some("input_gene_start")),
            ("Stop", Some("input_gene_stop")),
            ("Strand", Some("strand_orientation")),
            ("Element type", None),
        ])
    } else {
        FieldMap::new(&[("Protein identifier", Some("input_sequence_id")), ("Element", None)])
    };
    for (external, canonical) in AMRFINDER_SHARED {
        map.set(external, canonical);
    }
    map.set(AA_MUTATION, Some("amino_acid_mutation"));
    if nucleotide {
        map.set(NT_MUTATION, Some("nucleotide_mutation"));
    }
    map
}

fn amrfinderplus_row(row: &mut Row) -> Result<RowAction> {
    row.null_markers("NA");
    row.set(AA_MUTATION, None::<String>);
    row.set(NT_MUTATION, None::<String>);
    row.set(VARIATION, GENE_PRESENCE);

    // --plus runs also report stress and virulence genes
    if let Some(kind) = row.get_any(&["Element type", "Type", "Element"])
        && matches!(kind, "STRESS" | "VIRULENCE")
    {
        return Ok(RowAction::Drop);
    }

    if row.get_any(&["Element subtype", "Subtype"]) == Some("POINT") {
        let symbol = row.require("Gene symbol")?.to_string();
        let (gene, mutation) = symbol
            .rsplit_once('_')
            .ok_or_else(|| row.fault(format_args!("point mutation symbol '{}'", symbol)))?;
        let (reference, position, alt) = split_point_mutation(mutation)
            .ok_or_else(|| row.fault(format_args!("unrecognized mutation '{}'", mutation)))?;

        match row.get("Method") {
            Some("POINTX" | "POINTP") => {
                row.set(AA_MUTATION, format!("p.{}{}{}", reference, position, alt));
                row.set(VARIATION, AMINO_ACID_VARIANT);
            }
            Some("POINTN") => {
                row.set(NT_MUTATION, format!("c.{}{}>{}", position, reference, alt));
                row.set(VARIATION, NUCLEOTIDE_VARIANT);
            }
            _ => {}
        }
        row.set("Gene symbol", gene.to_string());
    }
    Ok(RowAction::Keep)
}

pub(super) const AMRFINDERPLUS: TabularHooks = TabularHooks {
    select: amrfinderplus_map,
    transform: Some(amrfinderplus_row),
    columns: None,
    layout: Layout::Tabs,
};

// ============================================================================
// ariba
// ============================================================================

fn ariba_map(_: &[String], _: Option<&StringRecord>) -> FieldMap {
    FieldMap::new(&[
        ("#ariba_ref_name", Some("reference_accession")),
        ("ref_name", Some("gene_name")),
        ("gene", None),
        ("var_only", None),
        ("flag", None),
        ("reads", None),
        ("cluster", None),
        ("ref_len", Some("reference_gene_length")),
        ("ref_base_assembled", None),
        ("pc_ident", Some("sequence_identity")),
        ("ctg", Some("input_sequence_id")),
        ("ctg_cov", Some("coverage_depth")),
        ("known_var", None),
        ("var_type", None),
        ("var_seq_type", None),
        ("known_var_change", None),
        ("has_known_var", None),
        ("ref_ctg_change", None),
        ("ref_ctg_effect", None),
        ("ref_start", None),
        ("ref_end", None),
        ("ref_nt", None),
        ("ctg_start", None),
        ("ctg_end", None),
        ("smtls_total_depth", None),
        ("smtls_nts", None),
        ("smtls_nts_depth", None),
        ("var_description", None),
        ("free_text", None),
        ("_gene_symbol", Some("gene_symbol")),
    ])
}

fn ariba_row(row: &mut Row) -> Result<RowAction> {
    let symbol = row.require("ref_name")?.split('.').next().unwrap_or_default().to_string();
    row.set("_gene_symbol", symbol);
    Ok(RowAction::Keep)
}

pub(super) const ARIBA: TabularHooks = TabularHooks {
    select: ariba_map,
    transform: Some(ariba_row),
    columns: None,
    layout: Layout::Tabs,
};

// ============================================================================
// rgi
// ============================================================================

const RGI_BWT_MARKER: &str = "Resistomes & Variants: Observed in Genome(s)";

/// Alignment-mapping (bwt) reports are told apart by their header; assembly
/// reports run on ORFs leave the contig column empty
fn rgi_map(header: &[String], first_row: Option<&StringRecord>) -> FieldMap {
    if header.iter().any(|h| h == RGI_BWT_MARKER) {
        return FieldMap::new(&[
            ("ARO Term", Some("gene_symbol")),
            ("ARO Accession", Some("reference_accession")),
            ("Reference Model Type", None),
            ("Reference DB", Some("reference_database_name")),
            ("Alleles with Mapped Reads", None),
            (
                "Reference Allele(s) Identity to CARD Reference Protein (%)",
                Some("sequence_identity"),
            ),
            (RGI_BWT_MARKER, None),
            ("Resistomes & Variants: Observed in Plasmid(s)", None),
            ("Resistomes & Variants: Observed Pathogen(s)", None),
            ("Completely Mapped Reads", None),
            ("Mapped Reads with Flanking Sequence", None),
            ("All Mapped Reads", None),
            ("Average Percent Coverage", Some("coverage_percentage")),
            ("Average Length Coverage (bp)", Some("input_gene_length")),
            ("Average MAPQ (Completely Mapped Reads)", None),
            ("Reference Length", Some("reference_gene_length")),
            ("AMR Gene Family", Some("gene_name")),
            ("Drug Class", Some("drug_class")),
            ("Resistance Mechanism", Some("resistance_mechanism")),
            (VARIATION, Some("genetic_variation_type")),
        ]);
    }

    let mut map = FieldMap::new(&[
        ("ORF_ID", None),
        ("Contig", Some("input_sequence_id")),
        ("Start", Some("input_gene_start")),
        ("Stop", Some("input_gene_stop")),
        ("Orientation", Some("strand_orientation")),
        ("Cut_Off", None),
        ("Pass_Bitscore", None),
        ("Best_Hit_Bitscore", None),
        ("Best_Hit_ARO", Some("gene_symbol")),
        ("Best_Identities", Some("sequence_identity")),
        ("ARO", Some("reference_accession")),
        ("Model_type", None),
        ("SNPs_in_Best_Hit_ARO", None),
        ("Other_SNPs", None),
        ("Drug Class", Some("drug_class")),
        ("Resistance Mechanism", Some("resistance_mechanism")),
        ("AMR Gene Family", Some("gene_name")),
        ("Predicted_DNA", None),
        ("Predicted_Protein", None),
        ("CARD_Protein_Sequence", None),
        ("Percentage Length of Reference Sequence", Some("coverage_percentage")),
        ("ID", None),
        ("Model_ID", None),
        ("Nudged", None),
        ("Note", None),
        (NT_MUTATION, Some("nucleotide_mutation")),
        (AA_MUTATION, Some("amino_acid_mutation")),
        (VARIATION, Some("genetic_variation_type")),
    ]);
    if first_row.and_then(|r| r.get(1)).is_some_and(|c| c.trim().is_empty()) {
        map.set("ORF_ID", Some("input_sequence_id"));
        map.set("Contig", None);
    }
    map
}

fn rgi_row(row: &mut Row) -> Result<RowAction> {
    row.set(AA_MUTATION, None::<String>);
    row.set(NT_MUTATION, None::<String>);
    row.set(VARIATION, GENE_PRESENCE);

    let Some(model) = row.get("Model_type").map(str::to_string) else {
        // bwt: mapped length is floored to compare with other lengths
        if let Some(length) = row.get("Average Length Coverage (bp)").map(str::trim)
            && !length.is_empty()
        {
            let floored = length
                .parse::<f64>()
                .map_err(|_| row.fault(format_args!("average length '{}'", length)))?
                .floor();
            row.set("Average Length Coverage (bp)", floored as i64);
        }
        return Ok(RowAction::Keep);
    };

    let snps: Vec<String> = row
        .get("SNPs_in_Best_Hit_ARO")
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "n/a")
        .map(|s| s.split(',').map(|m| m.trim().to_string()).collect())
        .unwrap_or_default();

    match model.as_str() {
        "protein variant model" | "protein overexpression model" => {
            row.set(VARIATION, AMINO_ACID_VARIANT);
            if !snps.is_empty() {
                let changes: Vec<String> = snps.iter().map(|m| format!("p.{}", m)).collect();
                row.set(AA_MUTATION, changes.join(", "));
            }
        }
        "rrna variant model" => {
            row.set(VARIATION, NUCLEOTIDE_VARIANT);
            if !snps.is_empty() {
                let mut changes = Vec::with_capacity(snps.len());
                for snp in &snps {
                    let (reference, position, alt) = split_point_mutation(snp)
                        .ok_or_else(|| row.fault(format_args!("unrecognized SNP '{}'", snp)))?;
                    changes.push(format!("n.{}{}>{}", position, reference, alt));
                }
                row.set(NT_MUTATION, changes.join(", "));
            }
        }
        _ => {}
    }
    Ok(RowAction::Keep)
}

pub(super) const RGI: TabularHooks = TabularHooks {
    select: rgi_map,
    transform: Some(rgi_row),
    columns: None,
    layout: Layout::Tabs,
};

// ============================================================================
// resfinder (tabular) and pointfinder
// ============================================================================

fn resfinder_tab_map(_: &[String], _: Option<&StringRecord>) -> FieldMap {
    FieldMap::new(&[
        ("Resistance gene", Some("gene_symbol")),
        ("Identity", Some("sequence_identity")),
        ("Alignment Length/Gene Length", None),
        ("Position in reference", None),
        ("Contig", Some("input_sequence_id")),
        ("Position in contig", None),
        ("Accession no.", Some("reference_accession")),
        ("Phenotype", Some("drug_class")),
        ("Coverage", Some("coverage_percentage")),
        ("_start", Some("input_gene_start")),
        ("_stop", Some("input_gene_stop")),
        ("_strand", Some("strand_orientation")),
        ("_gene_name", Some("gene_name")),
        ("_reference_gene_length", Some("reference_gene_length")),
    ])
}

/// `Position in contig` reads `start..stop`; `Alignment Length/Gene Length`
/// reads `aligned/total`
fn resfinder_tab_row(row: &mut Row) -> Result<RowAction> {
    let gene = row.require("Resistance gene")?.to_string();
    row.set("_gene_name", gene);

    let position = row.require("Position in contig")?.to_string();
    let (a, b) = position
        .split_once("..")
        .and_then(|(a, b)| Some((a.trim().parse::<i64>().ok()?, b.trim().parse::<i64>().ok()?)))
        .ok_or_else(|| row.fault(format_args!("position in contig '{}'", position)))?;
    row.set("_start", a.min(b));
    row.set("_stop", a.max(b));
    row.set("_strand", if a <= b { "+" } else { "-" });

    let lengths = row.require("Alignment Length/Gene Length")?.to_string();
    let gene_length = lengths
        .split_once('/')
        .map(|(_, total)| total.trim().to_string())
        .ok_or_else(|| row.fault(format_args!("alignment/gene length '{}'", lengths)))?;
    row.set("_reference_gene_length", gene_length);
    Ok(RowAction::Keep)
}

pub(super) const RESFINDER_TAB: TabularHooks = TabularHooks {
    select: resfinder_tab_map,
    transform: Some(resfinder_tab_row),
    columns: None,
    layout: Layout::Tabs,
};

fn pointfinder_map(_: &[String], _: Option<&StringRecord>) -> FieldMap {
    FieldMap::new(&[
        ("Mutation", Some("reference_accession")),
        ("Nucleotide change", None),
        ("Amino acid change", None),
        ("Resistance", Some("drug_class")),
        ("PMID", None),
        (NT_MUTATION, Some("nucleotide_mutation")),
        (AA_MUTATION, Some("amino_acid_mutation")),
        (VARIATION, Some("genetic_variation_type")),
        ("_gene_symbol", Some("gene_symbol")),
        ("_gene_name", Some("gene_name")),
    ])
}

/// `Mutation` reads `<gene> <change>`; the change prefix gives the level
fn pointfinder_row(row: &mut Row) -> Result<RowAction> {
    let mutation = row.require("Mutation")?.to_string();
    let mut parts = mutation.split_whitespace();
    let (Some(gene), Some(change), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(row.fault(format_args!("mutation '{}'", mutation)));
    };

    row.set("_gene_symbol", gene);
    row.set("_gene_name", gene);
    if change.starts_with("p.") {
        row.set(AA_MUTATION, change);
        row.set(NT_MUTATION, None::<String>);
        row.set(VARIATION, AMINO_ACID_VARIANT);
    } else if ["r.", "n.", "c.", "g."].iter().any(|p| change.starts_with(p)) {
        row.set(AA_MUTATION, None::<String>);
        row.set(NT_MUTATION, change);
        row.set(VARIATION, NUCLEOTIDE_VARIANT);
    } else {
        return Err(row.fault(format_args!("mutation type of '{}' not recognized", change)));
    }
    Ok(RowAction::Keep)
}

pub(super) const POINTFINDER: TabularHooks = TabularHooks {
    select: pointfinder_map,
    transform: Some(pointfinder_row),
    columns: None,
    layout: Layout::Tabs,
};

// ============================================================================
// staramr, srax, srst2
// ============================================================================

fn staramr_map(_: &[String], _: Option<&StringRecord>) -> FieldMap {
    FieldMap::new(&[
        ("Isolate ID", Some("input_file_name")),
        ("Gene", Some("gene_symbol")),
        ("Predicted Phenotype", Some("drug_class")),
        ("%Identity", Some("sequence_identity")),
        ("%Overlap", Some("coverage_percentage")),
        ("HSP Length/Total Length", None),
        ("Contig", Some("input_sequence_id")),
        ("Start", Some("input_gene_start")),
        ("End", Some("input_gene_stop")),
        ("Accession", Some("reference_accession")),
        ("_coverage_ratio", Some("coverage_ratio")),
        ("_gene_name", Some("gene_name")),
    ])
}

fn staramr_row(row: &mut Row) -> Result<RowAction> {
    let gene = row.require("Gene")?.to_string();
    row.set("_gene_name", gene);

    let lengths = row.require("HSP Length/Total Length")?.to_string();
    let ratio = lengths
        .split_once('/')
        .and_then(|(hsp, total)| {
            let hsp = hsp.trim().parse::<f64>().ok()?;
            let total = total.trim().parse::<f64>().ok()?;
            (total != 0.0).then(|| hsp / total)
        })
        .ok_or_else(|| row.fault(format_args!("HSP/total length '{}'", lengths)))?;
    row.set("_coverage_ratio", ratio);
    Ok(RowAction::Keep)
}

pub(super) const STARAMR: TabularHooks = TabularHooks {
    select: staramr_map,
    transform: Some(staramr_row),
    columns: None,
    layout: Layout::Tabs,
};

fn srax_map(_: &[String], _: Option<&StringRecord>) -> FieldMap {
    FieldMap::new(&[
        ("Locus ID", None),
        ("# Sequences", None),
        ("ARG", Some("gene_symbol")),
        ("Coverage (%)", Some("coverage_percentage")),
        ("Identity (%)", Some("sequence_identity")),
        ("Drug class", Some("drug_class")),
        ("Gene accession ID", Some("reference_accession")),
        ("Gene description", Some("gene_name")),
        ("AMR detection model", None),
    ])
}

pub(super) const SRAX: TabularHooks = TabularHooks {
    select: srax_map,
    transform: None,
    columns: None,
    layout: Layout::Tabs,
};

fn srst2_map(_: &[String], _: Option<&StringRecord>) -> FieldMap {
    FieldMap::new(&[
        ("Sample", Some("input_file_name")),
        ("DB", Some("reference_database_name")),
        ("gene", Some("gene_symbol")),
        ("allele", Some("gene_name")),
        ("coverage", Some("coverage_percentage")),
        ("depth", Some("coverage_depth")),
        ("diffs", None),
        ("uncertainty", None),
        ("divergence", None),
        ("length", Some("reference_gene_length")),
        ("maxMAF", None),
        ("clusterid", None),
        ("seqid", Some("reference_accession")),
        ("annotation", None),
    ])
}

pub(super) const SRST2: TabularHooks = TabularHooks {
    select: srst2_map,
    transform: None,
    columns: None,
    layout: Layout::Tabs,
};

// ============================================================================
// kmerresistance, deeparg, amrplusplus
// ============================================================================

fn kmerresistance_map(_: &[String], _: Option<&StringRecord>) -> FieldMap {
    FieldMap::new(&[
        ("#Template", Some("reference_accession")),
        ("Score", None),
        ("Expected", None),
        ("Template_length", Some("reference_gene_length")),
        ("Template_Identity", None),
        ("Template_Coverage", Some("coverage_percentage")),
        ("Query_Identity", Some("sequence_identity")),
        ("Query_Coverage", None),
        ("Depth", Some("coverage_depth")),
        ("q_value", None),
        ("p_value", None),
        ("_gene_name", Some("gene_name")),
        ("_gene_symbol", Some("gene_symbol")),
    ])
}

/// Templates read `<symbol>_<allele>_<accession>`
fn kmerresistance_row(row: &mut Row) -> Result<RowAction> {
    let template = row.require("#Template")?.to_string();
    let name = template.rsplit_once('_').map_or(template.as_str(), |(name, _)| name);
    let symbol = template.split('_').next().unwrap_or_default();
    row.set("_gene_name", name);
    row.set("_gene_symbol", symbol);
    Ok(RowAction::Keep)
}

pub(super) const KMERRESISTANCE: TabularHooks = TabularHooks {
    select: kmerresistance_map,
    transform: Some(kmerresistance_row),
    columns: None,
    layout: Layout::Tabs,
};

fn deeparg_map(_: &[String], _: Option<&StringRecord>) -> FieldMap {
    FieldMap::new(&[
        ("#ARG", Some("gene_symbol")),
        ("query-start", Some("input_gene_start")),
        ("query-end", Some("input_gene_stop")),
        ("read_id", Some("input_sequence_id")),
        ("predicted_ARG-class", Some("drug_class")),
        ("best-hit", Some("gene_name")),
        ("probability", None),
        ("identity", Some("sequence_identity")),
        ("alignment-length", None),
        ("alignment-bitscore", None),
        ("alignment-evalue", None),
        ("counts", None),
        ("_reference_accession", Some("reference_accession")),
    ])
}

fn deeparg_row(row: &mut Row) -> Result<RowAction> {
    let accession = row.require("best-hit")?.split('|').next().unwrap_or_default().to_string();
    row.set("_reference_accession", accession);
    Ok(RowAction::Keep)
}

pub(super) const DEEPARG: TabularHooks = TabularHooks {
    select: deeparg_map,
    transform: Some(deeparg_row),
    columns: None,
    layout: Layout::Tabs,
};

fn amrplusplus_map(_: &[String], _: Option<&StringRecord>) -> FieldMap {
    FieldMap::new(&[
        ("Sample", Some("input_file_name")),
        ("Gene", None),
        ("Hits", None),
        ("Gene Fraction", Some("coverage_percentage")),
        ("_reference_accession", Some("reference_accession")),
        ("_gene_name", Some("gene_name")),
        ("_gene_symbol", Some("gene_symbol")),
        ("_drug_class", Some("drug_class")),
    ])
}

/// `Gene` reads `<accession>|<type>|<class>|...|<name>|<symbol>`
fn amrplusplus_row(row: &mut Row) -> Result<RowAction> {
    let gene = row.require("Gene")?.replace("|RequiresSNPConfirmation", "");
    let parts: Vec<&str> = gene.split('|').collect();
    if parts.len() < 4 {
        return Err(row.fault(format_args!("gene hierarchy '{}'", gene)));
    }
    row.set("_reference_accession", parts[0]);
    row.set("_drug_class", parts[2]);
    row.set("_gene_name", parts[parts.len() - 2]);
    row.set("_gene_symbol", parts[parts.len() - 1]);
    Ok(RowAction::Keep)
}

pub(super) const AMRPLUSPLUS: TabularHooks = TabularHooks {
    select: amrplusplus_map,
    transform: Some(amrplusplus_row),
    columns: None,
    layout: Layout::Tabs,
};

// ============================================================================
// header-less reports: groot, csstar
// ============================================================================

const GROOT_COLUMNS: [&str; 4] = ["reference_accession", "read_count", "gene_length", "cigar_string"];

fn groot_map(_: &[String], _: Option<&StringRecord>) -> FieldMap {
    FieldMap::new(&[
        ("reference_accession", Some("reference_accession")),
        ("read_count", Some("coverage_depth")),
        ("gene_length", Some("reference_gene_length")),
        ("cigar_string", None),
        ("_gene_name", Some("gene_name")),
        ("_gene_symbol", Some("gene_symbol")),
    ])
}

/// Accessions read `<symbol>.<...>`; the first three dotted parts name the gene
fn groot_row(row: &mut Row) -> Result<RowAction> {
    let accession = row.require("reference_accession")?.to_string();
    let name = accession.split('.').take(3).collect::<Vec<_>>().join(".");
    let symbol = accession.split('.').next().unwrap_or_default().to_string();
    row.set("_gene_name", name);
    row.set("_gene_symbol", symbol);
    Ok(RowAction::Keep)
}

pub(super) const GROOT: TabularHooks = TabularHooks {
    select: groot_map,
    transform: Some(groot_row),
    columns: Some(&GROOT_COLUMNS),
    layout: Layout::Tabs,
};

const CSSTAR_COLUMNS: [&str; 7] = [
    "gene",
    "reference",
    "match_type",
    "contig",
    "identity",
    "target_length",
    "reference_length",
];

fn csstar_map(_: &[String], _: Option<&StringRecord>) -> FieldMap {
    FieldMap::new(&[
        ("gene", Some("gene_symbol")),
        ("reference", Some("gene_name")),
        ("match_type", None),
        ("contig", Some("input_sequence_id")),
        ("identity", Some("sequence_identity")),
        ("target_length", Some("input_gene_length")),
        ("reference_length", Some("reference_gene_length")),
        ("_reference_accession", Some("reference_accession")),
    ])
}

/// Strip the match-quality markers csstar appends to names
fn csstar_clean(name: &str) -> String {
    name.replace(['*', '?'], "").replace("TR$", "").replace('$', "")
}

fn csstar_row(row: &mut Row) -> Result<RowAction> {
    let gene = csstar_clean(row.require("gene")?);
    let reference = csstar_clean(row.require("reference")?);
    let identity = row.require("identity")?.replace('%', "");
    row.set("gene", gene);
    row.set("_reference_accession", reference.clone());
    row.set("reference", reference);
    row.set("identity", identity);
    Ok(RowAction::Keep)
}

pub(super) const CSSTAR: TabularHooks = TabularHooks {
    select: csstar_map,
    transform: Some(csstar_row),
    columns: Some(&CSSTAR_COLUMNS),
    layout: Layout::Tabs,
};

// ============================================================================
// hmmer tables (resfams, fargene)
// ============================================================================

const RESFAMS_COLUMNS: [&str; 19] = [
    "target name",
    "target accession",
    "query name",
    "query accession",
    "full E-value",
    "full score",
    "full bias",
    "domain E-value",
    "domain score",
    "domain bias",
    "exp",
    "reg",
    "clu",
    "ov",
    "env",
    "dom",
    "rep",
    "inc",
    "description of target",
];

fn resfams_map(_: &[String], _: Option<&StringRecord>) -> FieldMap {
    FieldMap::new(&[
        ("query name", Some("gene_name")),
        ("query accession", Some("reference_accession")),
        ("_gene_symbol", Some("gene_symbol")),
    ])
}

/// hmm names read `<symbol>_<family>`
fn hmm_symbol(row: &Row) -> Result<String> {
    let query = row.require("query name")?;
    Ok(query.split('_').next().unwrap_or(query).to_string())
}

fn resfams_row(row: &mut Row) -> Result<RowAction> {
    let symbol = hmm_symbol(row)?;
    row.set("_gene_symbol", symbol);
    Ok(RowAction::Keep)
}

pub(super) const RESFAMS: TabularHooks = TabularHooks {
    select: resfams_map,
    transform: Some(resfams_row),
    columns: Some(&RESFAMS_COLUMNS),
    layout: Layout::Whitespace,
};

const FARGENE_COLUMNS: [&str; 23] = [
    "target name",
    "target accession",
    "tlen",
    "query name",
    "query accession",
    "qlen",
    "full E-value",
    "full score",
    "full bias",
    "domain #",
    "domain of",
    "domain c-Evalue",
    "domain i-Evalue",
    "domain score",
    "domain bias",
    "hmm from",
    "hmm to",
    "ali from",
    "ali to",
    "env from",
    "env to",
    "acc",
    "description of target",
];

fn fargene_map(_: &[String], _: Option<&StringRecord>) -> FieldMap {
    FieldMap::new(&[
        ("target name", Some("input_sequence_id")),
        ("tlen", Some("input_protein_length")),
        ("query name", Some("reference_accession")),
        ("qlen", Some("reference_protein_length")),
        ("hmm from", Some("reference_protein_start")),
        ("hmm to", Some("reference_protein_stop")),
        ("ali from", Some("input_protein_start")),
        ("ali to", Some("input_protein_stop")),
        ("query name", Some("gene_name")),
        ("_gene_symbol", Some("gene_symbol")),
        ("_gene_symbol", Some("drug_class")),
    ])
}

fn fargene_row(row: &mut Row) -> Result<RowAction> {
    let symbol = hmm_symbol(row)?;
    row.set("_gene_symbol", symbol);
    Ok(RowAction::Keep)
}

pub(super) const FARGENE: TabularHooks = TabularHooks {
    select: fargene_map,
    transform: Some(fargene_row),
    columns: Some(&FARGENE_COLUMNS),
    layout: Layout::Whitespace,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HamronizeError;

    fn row(header: &[&str], cells: &[&str]) -> Row {
        let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
        Row::new(2, &header, &StringRecord::from(cells.to_vec()))
    }

    #[test]
    fn test_split_point_mutation() {
        assert_eq!(split_point_mutation("S83L"), Some(("S", "83", "L")));
        assert_eq!(split_point_mutation("G2032T"), Some(("G", "2032", "T")));
        assert_eq!(split_point_mutation("C-11C"), Some(("C-", "11", "C")));
        assert_eq!(split_point_mutation("2032T"), None);
        assert_eq!(split_point_mutation("S83"), None);
        assert_eq!(split_point_mutation("S83L4"), None);
    }

    #[test]
    fn test_amrfinderplus_protein_point_mutation() {
        let mut r = row(
            &["Gene symbol", "Element type", "Element subtype", "Method"],
            &["gyrA_S83L", "AMR", "POINT", "POINTX"],
        );
        assert_eq!(amrfinderplus_row(&mut r).unwrap(), RowAction::Keep);
        assert_eq!(r.get("Gene symbol"), Some("gyrA"));
        assert_eq!(r.get(AA_MUTATION), Some("p.S83L"));
        assert_eq!(r.get(NT_MUTATION), None);
        assert_eq!(r.get(VARIATION), Some(AMINO_ACID_VARIANT));
    }

    #[test]
    fn test_amrfinderplus_nucleotide_point_mutation() {
        let mut r = row(
            &["Gene symbol", "Element type", "Element subtype", "Method", "Start"],
            &["23S_G2032T", "AMR", "POINT", "POINTN", "NA"],
        );
        amrfinderplus_row(&mut r).unwrap();
        assert_eq!(r.get(NT_MUTATION), Some("c.2032G>T"));
        assert_eq!(r.get(VARIATION), Some(NUCLEOTIDE_VARIANT));
        assert!(r.value("Start").unwrap().is_null());
    }

    #[test]
    fn test_amrfinderplus_drops_virulence() {
        let mut r = row(&["Gene symbol", "Element type"], &["iutA", "VIRULENCE"]);
        assert_eq!(amrfinderplus_row(&mut r).unwrap(), RowAction::Drop);
    }

    #[test]
    fn test_amrfinderplus_map_selection() {
        let nucleotide = StringRecord::from(vec!["NA", "contig_1"]);
        let protein = StringRecord::from(vec!["WP_000027057.1", "blaTEM-1"]);
        let nt_map = amrfinderplus_map(&[], Some(&nucleotide));
        let aa_map = amrfinderplus_map(&[], Some(&protein));
        assert_eq!(nt_map.target("Contig id"), Some(Some("input_sequence_id")));
        assert_eq!(aa_map.target("Protein identifier"), Some(Some("input_sequence_id")));
        assert_eq!(aa_map.target(NT_MUTATION), None);
        nt_map.validate().unwrap();
        aa_map.validate().unwrap();
    }

    #[test]
    fn test_rgi_variant_models() {
        let header = ["Model_type", "SNPs_in_Best_Hit_ARO"];
        let mut r = row(&header, &["protein variant model", "S83L,D87N"]);
        rgi_row(&mut r).unwrap();
        assert_eq!(r.get(AA_MUTATION), Some("p.S83L, p.D87N"));
        assert_eq!(r.get(VARIATION), Some(AMINO_ACID_VARIANT));

        let mut r = row(&header, &["rrna variant model", "A2058G"]);
        rgi_row(&mut r).unwrap();
        assert_eq!(r.get(NT_MUTATION), Some("n.2058A>G"));
        assert_eq!(r.get(VARIATION), Some(NUCLEOTIDE_VARIANT));

        let mut r = row(&header, &["protein homolog model", "n/a"]);
        rgi_row(&mut r).unwrap();
        assert_eq!(r.get(AA_MUTATION), None);
        assert_eq!(r.get(VARIATION), Some(GENE_PRESENCE));
    }

    #[test]
    fn test_rgi_bwt_length_floored() {
        let mut r = row(&["ARO Term", "Average Length Coverage (bp)"], &["mecA", "1203.76"]);
        rgi_row(&mut r).unwrap();
        assert_eq!(r.value("Average Length Coverage (bp)").unwrap().as_i64(), Some(1203));
    }

    #[test]
    fn test_rgi_map_selection() {
        let bwt = rgi_map(&[RGI_BWT_MARKER.to_string()], None);
        assert_eq!(bwt.target("ARO Term"), Some(Some("gene_symbol")));

        let orf_row = StringRecord::from(vec!["orf_1", "", "10"]);
        let orf = rgi_map(&["ORF_ID".to_string()], Some(&orf_row));
        assert_eq!(orf.target("ORF_ID"), Some(Some("input_sequence_id")));
        assert_eq!(orf.target("Contig"), Some(None));
    }

    #[test]
    fn test_resfinder_tab_positions() {
        let mut r = row(
            &["Resistance gene", "Position in contig", "Alignment Length/Gene Length"],
            &["blaTEM-1B", "11277..10432", "861/861"],
        );
        resfinder_tab_row(&mut r).unwrap();
        assert_eq!(r.value("_start").unwrap().as_i64(), Some(10432));
        assert_eq!(r.value("_stop").unwrap().as_i64(), Some(11277));
        assert_eq!(r.get("_strand"), Some("-"));
        assert_eq!(r.get("_reference_gene_length"), Some("861"));

        let mut bad = row(
            &["Resistance gene", "Position in contig", "Alignment Length/Gene Length"],
            &["x", "10432-11277", "1/1"],
        );
        assert!(resfinder_tab_row(&mut bad).unwrap_err().is_record_level());
    }

    #[test]
    fn test_pointfinder_change_prefix() {
        let mut r = row(&["Mutation"], &["gyrA p.S83L"]);
        pointfinder_row(&mut r).unwrap();
        assert_eq!(r.get("_gene_symbol"), Some("gyrA"));
        assert_eq!(r.get(AA_MUTATION), Some("p.S83L"));

        let mut r = row(&["Mutation"], &["23S r.2611C>T"]);
        pointfinder_row(&mut r).unwrap();
        assert_eq!(r.get(NT_MUTATION), Some("r.2611C>T"));
        assert_eq!(r.get(VARIATION), Some(NUCLEOTIDE_VARIANT));

        let mut r = row(&["Mutation"], &["gyrA x.S83L"]);
        let err = pointfinder_row(&mut r).unwrap_err();
        assert!(matches!(err, HamronizeError::SourceFormat(ref m) if m.contains("x.S83L")));
    }

    #[test]
    fn test_staramr_coverage_ratio() {
        let mut r = row(&["Gene", "HSP Length/Total Length"], &["blaTEM-1B", "430/861"]);
        staramr_row(&mut r).unwrap();
        let ratio = r.value("_coverage_ratio").unwrap().as_f64().unwrap();
        assert!((ratio - 430.0 / 861.0).abs() < 1e-12);

        let mut zero = row(&["Gene", "HSP Length/Total Length"], &["x", "1/0"]);
        assert!(staramr_row(&mut zero).is_err());
    }

    #[test]
    fn test_derived_names() {
        let mut r = row(&["#Template"], &["blaOXA-48_1_AY236073"]);
        kmerresistance_row(&mut r).unwrap();
        assert_eq!(r.get("_gene_name"), Some("blaOXA-48_1"));
        assert_eq!(r.get("_gene_symbol"), Some("blaOXA-48"));

        let mut r = row(&["reference_accession"], &["groot-db_RESFINDER__blaOXA-48.1.AY236073"]);
        groot_row(&mut r).unwrap();
        assert_eq!(r.get("_gene_symbol"), Some("groot-db_RESFINDER__blaOXA-48"));
        assert_eq!(r.get("_gene_name"), Some("groot-db_RESFINDER__blaOXA-48.1.AY236073"));

        let mut r = row(&["ref_name"], &["tet(M).3003"]);
        ariba_row(&mut r).unwrap();
        assert_eq!(r.get("_gene_symbol"), Some("tet(M)"));

        let mut r = row(&["best-hit"], &["ACH58985.1|FEATURES|tetA"]);
        deeparg_row(&mut r).unwrap();
        assert_eq!(r.get("_reference_accession"), Some("ACH58985.1"));
    }

    #[test]
    fn test_amrplusplus_hierarchy() {
        let mut r = row(
            &["Gene"],
            &["MEG_3178|Drugs|Aminoglycosides|Aminoglycoside-resistant_16S_ribosomal_subunit_protein|A16S|RequiresSNPConfirmation"],
        );
        amrplusplus_row(&mut r).unwrap();
        assert_eq!(r.get("_reference_accession"), Some("MEG_3178"));
        assert_eq!(r.get("_drug_class"), Some("Aminoglycosides"));
        assert_eq!(
            r.get("_gene_name"),
            Some("Aminoglycoside-resistant_16S_ribosomal_subunit_protein")
        );
        assert_eq!(r.get("_gene_symbol"), Some("A16S"));

        let mut short = row(&["Gene"], &["MEG_1|Drugs"]);
        assert!(amrplusplus_row(&mut short).is_err());
    }

    #[test]
    fn test_csstar_markers_removed() {
        let mut r = row(
            &CSSTAR_COLUMNS,
            &["tetM*", "tetM_1_X90939$", "x", "contig_3", "99.5%", "1920", "1920"],
        );
        csstar_row(&mut r).unwrap();
        assert_eq!(r.get("gene"), Some("tetM"));
        assert_eq!(r.get("reference"), Some("tetM_1_X90939"));
        assert_eq!(r.get("_reference_accession"), Some("tetM_1_X90939"));
        assert_eq!(r.get("identity"), Some("99.5"));
    }

    #[test]
    fn test_hmm_symbol_from_query_name() {
        let mut r = row(&RESFAMS_COLUMNS[..4], &["c1_7", "-", "TEM_beta-lactamase", "RF0053"]);
        resfams_row(&mut r).unwrap();
        assert_eq!(r.get("_gene_symbol"), Some("TEM"));

        let mut r = row(&FARGENE_COLUMNS[..4], &["c2_1", "-", "300", "class_A"]);
        fargene_row(&mut r).unwrap();
        assert_eq!(r.get("_gene_symbol"), Some("class"));
    }

    #[test]
    fn test_every_map_targets_canonical_fields() {
        let selects = [
            ABRICATE, AMRFINDERPLUS, ARIBA, RGI, RESFINDER_TAB, POINTFINDER, STARAMR, SRAX,
            SRST2, KMERRESISTANCE, DEEPARG, AMRPLUSPLUS, GROOT, CSSTAR, RESFAMS, FARGENE,
        ];
        for hooks in selects {
            (hooks.select)(&[], None).validate().unwrap();
        }
    }
}
