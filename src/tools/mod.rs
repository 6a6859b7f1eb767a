//! Registry of supported tools
//!
//! Each tool names the metadata callers must supply, the facts its adapter
//! injects into every record, and the adapter variant that reads its report.

mod tabular;

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use crate::adapter::tabular::TabularHooks;
use crate::error::{HamronizeError, Result};
use crate::record::GENE_PRESENCE;

const SOFTWARE_NAME: &str = "analysis_software_name";
const SOFTWARE_VERSION: &str = "analysis_software_version";
const DB_NAME: &str = "reference_database_name";
const DB_VERSION: &str = "reference_database_version";
const INPUT_FILE: &str = "input_file_name";
const VARIATION: &str = "genetic_variation_type";

/// How a tool's report is read
#[derive(Clone, Copy)]
pub enum AdapterKind {
    Tabular(TabularHooks),
    Graph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum Tool {
    Abricate,
    Amrfinderplus,
    Amrplusplus,
    Ariba,
    Csstar,
    Deeparg,
    Fargene,
    Groot,
    Kmerresistance,
    Pointfinder,
    Resfams,
    Resfinder,
    ResfinderTab,
    Rgi,
    Srax,
    Srst2,
    Staramr,
}

impl Tool {
    pub const ALL: [Tool; 17] = [
        Tool::Abricate,
        Tool::Amrfinderplus,
        Tool::Amrplusplus,
        Tool::Ariba,
        Tool::Csstar,
        Tool::Deeparg,
        Tool::Fargene,
        Tool::Groot,
        Tool::Kmerresistance,
        Tool::Pointfinder,
        Tool::Resfams,
        Tool::Resfinder,
        Tool::ResfinderTab,
        Tool::Rgi,
        Tool::Srax,
        Tool::Srst2,
        Tool::Staramr,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Abricate => "abricate",
            Tool::Amrfinderplus => "amrfinderplus",
            Tool::Amrplusplus => "amrplusplus",
            Tool::Ariba => "ariba",
            Tool::Csstar => "csstar",
            Tool::Deeparg => "deeparg",
            Tool::Fargene => "fargene",
            Tool::Groot => "groot",
            Tool::Kmerresistance => "kmerresistance",
            Tool::Pointfinder => "pointfinder",
            Tool::Resfams => "resfams",
            Tool::Resfinder => "resfinder",
            Tool::ResfinderTab => "resfinder-tab",
            Tool::Rgi => "rgi",
            Tool::Srax => "srax",
            Tool::Srst2 => "srst2",
            Tool::Staramr => "staramr",
        }
    }

    pub fn from_name(name: &str) -> Result<Tool> {
        Tool::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| HamronizeError::UnknownTool {
                name: name.to_string(),
                valid: Tool::ALL.iter().map(|t| t.name().to_string()).collect(),
            })
    }

    /// Which report file of the tool to pass in
    pub fn report_hint(&self) -> &'static str {
        match self {
            Tool::Abricate => "OUTPUT.tsv",
            Tool::Amrfinderplus => "OUTPUT.tsv (amrfinder --output)",
            Tool::Amrplusplus => "gene.tsv",
            Tool::Ariba => "OUTDIR/report.tsv",
            Tool::Csstar => "OUTPUT.tsv (csstar stdout)",
            Tool::Deeparg => "OUTDIR/OUTPUT.mapping.ARG",
            Tool::Fargene => "retrieved-genes-*-hmmsearched.out",
            Tool::Groot => "OUTPUT.tsv (groot report)",
            Tool::Kmerresistance => "OUTPUT.res",
            Tool::Pointfinder => "PointFinder_results.txt",
            Tool::Resfams => "resfams.tblout",
            Tool::Resfinder => "OUTPUT.json (resfinder -j)",
            Tool::ResfinderTab => "ResFinder_results_tab.txt",
            Tool::Rgi => "OUTPUT.txt or OUTPUT_bwtoutput.gene_mapping_data.txt",
            Tool::Srax => "sraX_detected_ARGs.tsv",
            Tool::Srst2 => "OUTPUT_srst2_report.tsv",
            Tool::Staramr => "resfinder.tsv",
        }
    }

    /// Metadata keys the caller must supply
    pub fn required_metadata(&self) -> &'static [&'static str] {
        match self {
            Tool::Abricate | Tool::Staramr => &[SOFTWARE_VERSION, DB_VERSION],
            Tool::Ariba | Tool::Srax => &[SOFTWARE_VERSION, DB_VERSION, DB_NAME, INPUT_FILE],
            Tool::Groot | Tool::Csstar => &[SOFTWARE_VERSION, DB_NAME, DB_VERSION, INPUT_FILE],
            // the report carries its own versions
            Tool::Resfinder => &[INPUT_FILE],
            Tool::Amrfinderplus
            | Tool::Amrplusplus
            | Tool::Deeparg
            | Tool::Fargene
            | Tool::Kmerresistance
            | Tool::Pointfinder
            | Tool::Resfams
            | Tool::ResfinderTab
            | Tool::Rgi
            | Tool::Srst2 => &[SOFTWARE_VERSION, DB_VERSION, INPUT_FILE],
        }
    }

    /// Facts the adapter adds to every record, overriding caller metadata
    pub fn injected_metadata(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Tool::Abricate => &[(SOFTWARE_NAME, "abricate"), (VARIATION, GENE_PRESENCE)],
            Tool::Amrfinderplus => &[
                (SOFTWARE_NAME, "amrfinderplus"),
                (DB_NAME, "NCBI Reference Gene Database"),
            ],
            Tool::Amrplusplus => &[
                (SOFTWARE_NAME, "amrplusplus"),
                (DB_NAME, "megares"),
                (VARIATION, GENE_PRESENCE),
            ],
            Tool::Ariba => &[(SOFTWARE_NAME, "ariba"), (VARIATION, GENE_PRESENCE)],
            Tool::Csstar => &[(SOFTWARE_NAME, "csstar"), (VARIATION, GENE_PRESENCE)],
            Tool::Deeparg => &[
                (SOFTWARE_NAME, "deeparg"),
                (DB_NAME, "deeparg_db"),
                (VARIATION, GENE_PRESENCE),
            ],
            Tool::Fargene => &[
                (SOFTWARE_NAME, "fargene"),
                (DB_NAME, "fargene_hmms"),
                (VARIATION, GENE_PRESENCE),
            ],
            Tool::Groot => &[(SOFTWARE_NAME, "groot"), (VARIATION, GENE_PRESENCE)],
            Tool::Kmerresistance => &[
                (SOFTWARE_NAME, "kmerresistance"),
                (DB_NAME, "resfinder"),
                (VARIATION, GENE_PRESENCE),
            ],
            Tool::Pointfinder => &[(SOFTWARE_NAME, "pointfinder"), (DB_NAME, "pointfinder")],
            Tool::Resfams => &[
                (SOFTWARE_NAME, "resfams"),
                (DB_NAME, "resfams_hmms"),
                (VARIATION, GENE_PRESENCE),
            ],
            Tool::Resfinder => &[(SOFTWARE_NAME, "resfinder"), (DB_NAME, "resfinder")],
            Tool::ResfinderTab => &[
                (SOFTWARE_NAME, "resfinder"),
                (DB_NAME, "resfinder"),
                (VARIATION, GENE_PRESENCE),
            ],
            Tool::Rgi => &[(SOFTWARE_NAME, "rgi"), (DB_NAME, "CARD")],
            Tool::Srax => &[(SOFTWARE_NAME, "srax"), (VARIATION, GENE_PRESENCE)],
            Tool::Srst2 => &[(SOFTWARE_NAME, "srst2"), (VARIATION, GENE_PRESENCE)],
            Tool::Staramr => &[
                (SOFTWARE_NAME, "staramr"),
                (DB_NAME, "resfinder"),
                (VARIATION, GENE_PRESENCE),
            ],
        }
    }

    pub fn kind(&self) -> AdapterKind {
        match self {
            Tool::Abricate => AdapterKind::Tabular(tabular::ABRICATE),
            Tool::Amrfinderplus => AdapterKind::Tabular(tabular::AMRFINDERPLUS),
            Tool::Amrplusplus => AdapterKind::Tabular(tabular::AMRPLUSPLUS),
            Tool::Ariba => AdapterKind::Tabular(tabular::ARIBA),
            Tool::Csstar => AdapterKind::Tabular(tabular::CSSTAR),
            Tool::Deeparg => AdapterKind::Tabular(tabular::DEEPARG),
            Tool::Fargene => AdapterKind::Tabular(tabular::FARGENE),
            Tool::Groot => AdapterKind::Tabular(tabular::GROOT),
            Tool::Kmerresistance => AdapterKind::Tabular(tabular::KMERRESISTANCE),
            Tool::Pointfinder => AdapterKind::Tabular(tabular::POINTFINDER),
            Tool::Resfams => AdapterKind::Tabular(tabular::RESFAMS),
            Tool::Resfinder => AdapterKind::Graph,
            Tool::ResfinderTab => AdapterKind::Tabular(tabular::RESFINDER_TAB),
            Tool::Rgi => AdapterKind::Tabular(tabular::RGI),
            Tool::Srax => AdapterKind::Tabular(tabular::SRAX),
            Tool::Srst2 => AdapterKind::Tabular(tabular::SRST2),
            Tool::Staramr => AdapterKind::Tabular(tabular::STARAMR),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = HamronizeError;

    fn from_str(s: &str) -> Result<Self> {
        Tool::from_name(s)
    }
}
