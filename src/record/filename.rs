//! Input file name normalization
//!
//! Reports name their input in many ways (full paths, compressed reads,
//! assemblies with varying extensions). Records always carry the bare sample
//! stem so that results for the same input line up across tools.

const COMPRESSION_SUFFIXES: [&str; 5] = [".gz", ".bz2", ".xz", ".zip", ".zst"];

const SEQUENCE_SUFFIXES: [&str; 17] = [
    ".fasta", ".fas", ".fa", ".fna", ".ffn", ".faa", ".fsa", ".seq", ".fastq", ".fq", ".gbk",
    ".gb", ".gff", ".gff3", ".bam", ".sam", ".cram",
];

/// Reduce a file name to its base name, stripping one compression suffix
/// (if present) and then one recognized sequence-file suffix.
///
/// Suffix matching is case-insensitive and the longest matching suffix wins.
/// A name consisting only of a suffix is left alone.
pub fn normalize_input_file_name(name: &str) -> String {
    let base = name
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let stem = strip_longest_suffix(base, &COMPRESSION_SUFFIXES);
    strip_longest_suffix(stem, &SEQUENCE_SUFFIXES).to_string()
}

fn strip_longest_suffix<'a>(name: &'a str, suffixes: &[&str]) -> &'a str {
    let lower = name.to_ascii_lowercase();
    let longest = suffixes
        .iter()
        .filter(|s| lower.ends_with(*s) && lower.len() > s.len())
        .map(|s| s.len())
        .max();
    match longest {
        Some(len) => &name[..name.len() - len],
        None => name,
    }
}
