//! Source adapters: one tool report in, a lazy sequence of records out
//!
//! Adapters come in two shapes:
//! - tabular: a field map applied to each row of a tab- or blank-delimited report
//! - graph: a JSON report whose linked entities are flattened into records
//!
//! Both check the caller's metadata before any row is read and release the
//! report as soon as the sequence is exhausted or fails.

pub mod field_map;
pub mod source;
pub mod tabular;

use std::io::Read;
use std::iter::FusedIterator;
use std::path::Path;

use log::info;

use crate::error::Result;
use crate::graph::GraphAdapter;
use crate::metadata::MetadataContext;
use crate::record::Record;
use crate::tools::{AdapterKind, Tool};

pub use field_map::{FieldMap, FieldOverrides};
pub use source::Source;
pub use tabular::{Row, RowAction, TabularAdapter, TabularHooks};

/// Record sequence of one report
pub enum SourceAdapter<R> {
    Tabular(TabularAdapter<R>),
    Graph(GraphAdapter),
}

/// Open the report at `path` for `tool`.
///
/// Missing metadata is reported before the file is touched.
pub fn open(
    tool: Tool,
    path: impl AsRef<Path>,
    metadata: &MetadataContext,
    overrides: Option<&FieldOverrides>,
) -> Result<SourceAdapter<Source>> {
    metadata.require(tool.name(), tool.required_metadata())?;
    let path = path.as_ref();
    info!("Reading {} report {}", tool, path.display());
    from_reader(tool, source::open(path)?, metadata, overrides)
}

/// Build the adapter of `tool` over any reader
pub fn from_reader<R: Read>(
    tool: Tool,
    input: R,
    metadata: &MetadataContext,
    overrides: Option<&FieldOverrides>,
) -> Result<SourceAdapter<R>> {
    metadata.require(tool.name(), tool.required_metadata())?;
    let context = metadata.union(tool.injected_metadata().iter().copied());

    match tool.kind() {
        AdapterKind::Tabular(hooks) => Ok(SourceAdapter::Tabular(TabularAdapter::new(
            tool.name(),
            input,
            &hooks,
            context,
            overrides,
        )?)),
        AdapterKind::Graph => Ok(SourceAdapter::Graph(GraphAdapter::new(
            tool.name(),
            input,
            context,
        )?)),
    }
}

impl<R: Read> Iterator for SourceAdapter<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SourceAdapter::Tabular(adapter) => adapter.next(),
            SourceAdapter::Graph(adapter) => adapter.next(),
        }
    }
}

impl<R: Read> FusedIterator for SourceAdapter<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HamronizeError;
    use crate::record::{AMINO_ACID_VARIANT, GENE_PRESENCE, NUCLEOTIDE_VARIANT};
    use std::io::{Cursor, Write};

    fn metadata(pairs: &[(&str, &str)]) -> MetadataContext {
        MetadataContext::new(pairs.iter().copied())
    }

    fn versions() -> MetadataContext {
        metadata(&[
            ("analysis_software_version", "1.0.1"),
            ("reference_database_version", "2024-01-01"),
            ("input_file_name", "S1.fasta"),
        ])
    }

    fn records(tool: Tool, data: &str, metadata: &MetadataContext) -> Vec<Record> {
        from_reader(tool, Cursor::new(data.to_string()), metadata, None)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_missing_metadata_reported_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.tsv");
        let err = open(Tool::Srax, &absent, &metadata(&[]), None).err().unwrap();
        match err {
            HamronizeError::MissingMetadata { tool, missing } => {
                assert_eq!(tool, "srax");
                assert_eq!(missing.len(), 4);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_abricate_report() {
        let data = "#FILE\tSEQUENCE\tSTART\tEND\tSTRAND\tGENE\tCOVERAGE\tCOVERAGE_MAP\tGAPS\t%COVERAGE\t%IDENTITY\tDATABASE\tACCESSION\tPRODUCT\tRESISTANCE\n\
                    /data/S1.fna\tcontig_7\t101\t961\t+\tblaTEM-1\t1-861/861\t===============\t0/0\t100.00\t99.88\tncbi\tNG_050145.1\tclass A beta-lactamase TEM-1\tAMPICILLIN\n";
        let records = records(Tool::Abricate, data, &versions());
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.input_file_name(), "S1");
        assert_eq!(r.reference_database_name(), "ncbi");
        assert_eq!(r.analysis_software_name(), "abricate");
        assert_eq!(r.genetic_variation_type(), GENE_PRESENCE);
        assert_eq!(r.text("coverage_percentage").as_deref(), Some("100.0"));
        assert_eq!(r.text("input_gene_stop").as_deref(), Some("961"));
    }

    #[test]
    fn test_amrfinderplus_point_mutation_report() {
        let data = "Protein identifier\tContig id\tStart\tStop\tStrand\tGene symbol\tSequence name\tScope\tElement type\tElement subtype\tClass\tSubclass\tMethod\tTarget length\tReference sequence length\t% Coverage of reference sequence\t% Identity to reference sequence\tAlignment length\tAccession of closest sequence\tName of closest sequence\tHMM id\tHMM description\n\
                    NA\tcontig_2\t100\t2727\t+\tgyrA_S83L\tQuinolone resistant GyrA\tcore\tAMR\tPOINT\tQUINOLONE\tQUINOLONE\tPOINTX\t875\t875\t100.00\t99.89\t875\tWP_001281240.1\tDNA gyrase subunit A\tNA\tNA\n\
                    NA\tcontig_5\t10\t500\t-\tiutA\tferric aerobactin receptor\tplus\tVIRULENCE\tVIRULENCE\tNA\tNA\tBLASTX\t700\t700\t100.00\t100.00\t700\tWP_000000001.1\tiutA\tNA\tNA\n";
        let records = records(Tool::Amrfinderplus, data, &versions());
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.gene_symbol(), "gyrA");
        assert_eq!(r.reference_database_name(), "NCBI Reference Gene Database");
        assert_eq!(r.genetic_variation_type(), AMINO_ACID_VARIANT);
        assert_eq!(r.text("amino_acid_mutation").as_deref(), Some("p.S83L"));
        assert_eq!(r.text("input_sequence_id").as_deref(), Some("contig_2"));
    }

    #[test]
    fn test_pointfinder_bad_row_skipped() {
        let data = "Mutation\tNucleotide change\tAmino acid change\tResistance\tPMID\n\
                    gyrA p.S83L\tTCG -> TTG\tS -> L\tCiprofloxacin\t8891148\n\
                    gyrA q.S83L\tTCG -> TTG\tS -> L\tCiprofloxacin\t8891148\n\
                    23S r.2611C>T\tC -> T\tRNA mutations\tAzithromycin\t9\n";
        let records = records(Tool::Pointfinder, data, &versions());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].genetic_variation_type(), AMINO_ACID_VARIANT);
        assert_eq!(records[1].genetic_variation_type(), NUCLEOTIDE_VARIANT);
        assert_eq!(records[1].text("nucleotide_mutation").as_deref(), Some("r.2611C>T"));
    }

    #[test]
    fn test_field_overrides_applied() {
        let data = "ARG\tCoverage (%)\tIdentity (%)\tDrug class\tGene accession ID\tGene description\tAMR detection model\n\
                    tet(M)\t100\t99.5\tTetracycline\tX90939\ttetracycline resistance protein\tprotein homolog\n";
        let meta = versions().union([("reference_database_name", "basic")]);
        let overrides: FieldOverrides =
            [("AMR detection model".to_string(), Some("resistance_mechanism".to_string()))]
                .into_iter()
                .collect();
        let records: Vec<Record> =
            from_reader(Tool::Srax, Cursor::new(data.to_string()), &meta, Some(&overrides))
                .unwrap()
                .collect::<Result<_>>()
                .unwrap();
        assert_eq!(
            records[0].text("resistance_mechanism").as_deref(),
            Some("protein homolog")
        );
    }

    #[test]
    fn test_groot_headerless_report() {
        let data = "groot-db_RESFINDER__blaOXA-48.1.AY236073\t12\t798\t798M\n";
        let meta = versions().union([("reference_database_name", "groot-core-db")]);
        let records = records(Tool::Groot, data, &meta);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text("coverage_depth").as_deref(), Some("12.0"));
        assert_eq!(records[0].text("reference_gene_length").as_deref(), Some("798"));
    }

    #[test]
    fn test_fargene_hmmer_table() {
        let data = "#                                                      --- full sequence ---\n\
                    # target name  accession  tlen query name accession  qlen\n\
                    contig_4_12    -          286  class_A    -          271   1.2e-95  320.1   0.0   1   1   1.3e-98   1.4e-95  319.9   0.0     2   270     3   284     1   285 0.99 # 1 # 858 # 1\n";
        let records = records(Tool::Fargene, data, &versions());
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.gene_symbol(), "class");
        assert_eq!(r.gene_name(), "class_A");
        assert_eq!(r.reference_database_name(), "fargene_hmms");
        assert_eq!(r.text("input_sequence_id").as_deref(), Some("contig_4_12"));
        assert_eq!(r.text("input_protein_stop").as_deref(), Some("284"));
        assert_eq!(r.text("drug_class").as_deref(), Some("class"));
    }

    #[test]
    fn test_resfinder_graph_through_open() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"software_name": "ResFinder", "software_version": "4.5.0",
                "databases": {{"ResFinder-2.3.2": {{"database_name": "ResFinder", "database_version": "2.3.2"}}}},
                "seq_regions": {{"r": {{"name": "blaTEM-1B", "ref_acc": "AY458016"}}}},
                "phenotypes": {{"ampicillin": {{"amr_resistant": true, "amr_resistance": "ampicillin",
                                             "amr_classes": ["beta-lactam"], "seq_regions": ["r"]}}}}}}"#
        )
        .unwrap();
        let meta = metadata(&[("input_file_name", "S3.fastq.gz")]);
        let records: Vec<Record> = open(Tool::Resfinder, file.path(), &meta, None)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].input_file_name(), "S3");
        assert_eq!(records[0].analysis_software_version(), "4.5.0");
        assert_eq!(records[0].reference_database_version(), "2.3.2");
        assert_eq!(records[0].analysis_software_name(), "resfinder");
    }
}
