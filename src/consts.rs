// defaults
pub const DEFAULT_THREADS: usize = 10;
pub const DEFAULT_MEMORY: usize = 60;
pub const DEFAULT_PREFIX: &str = "align";
pub const DEFAULT_MAX_MISMATCH: f64 = 0.04;
pub const DEFAULT_DATA_TYPE: &str = "str_PE";

// GB kept free for rsem on top of the sort/ci budget
pub const RSEM_MEMORY_HEADROOM: usize = 3;

// project-wide names
pub const STARQUANT: &str = "starquant";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// formats
pub const BAM: &str = "bam";
pub const BW: &str = "bw";
pub const BG: &str = "bg";
pub const OUT: &str = "out";

// STAR filenames
pub const ALIGNED: &str = "Aligned";
pub const SORTED_BAM: &str = "Aligned.sortedByCoord.out.bam";
pub const TRANSCRIPTOME_BAM: &str = "Aligned.toTranscriptome.out.bam";
pub const SJ_TAB: &str = "SJ.out.tab";
pub const LOG_FINAL: &str = "Log.final.out";
pub const LOG_OUT: &str = "Log.out";
pub const LOG_PROGRESS: &str = "Log.progress.out";
pub const LOG: &str = "Log";
pub const STAR_TMP: &str = "_STARtmp";
pub const COMMENTS: &str = "commentsHeader.txt";
pub const CHR_NAME_LENGTH: &str = "chrNameLength.txt";

// signal filenames
pub const SIGNAL: &str = "Signal";
pub const SIGNAL_SORT_TMP: &str = "Signal.sort.tmp";
pub const CHR_NL: &str = "chrNL.txt";
pub const PRIMARY_CHROM_PREFIX: &str = "chr";

// normalizer filenames
pub const TR_HEADER: &str = "Tr.header.sam";
pub const TR_SORTED: &str = "Tr.sorted.bam";
pub const MATE_SEPARATOR: u8 = 0x1f;

// rsem filenames
pub const QUANT: &str = "Quant";
pub const GENES_RESULTS: &str = "Quant.genes.results";
pub const ISOFORMS_RESULTS: &str = "Quant.isoforms.results";
pub const QUANT_PDF: &str = "Quant.pdf";
pub const QUANT_STAT: &str = "Quant.stat";
pub const QUANT_TEMP: &str = "Quant.temp";
pub const RSEM_LOG: &str = "Log.rsem";
pub const RSEM_REF: &str = "RSEMref";
pub const RSEM_GRP: &str = "grp";
pub const RSEM_SEED: u32 = 12345;

// STAR filtering thresholds
pub const MULTIMAP_NMAX: u32 = 20;
pub const MISMATCH_NMAX: u32 = 999;
pub const INTRON_MIN: u32 = 20;
pub const INTRON_MAX: u32 = 1_000_000;
pub const MATES_GAP_MAX: u32 = 1_000_000;
pub const SJ_OVERHANG_MIN: u32 = 8;
pub const SJDB_OVERHANG_MIN: u32 = 1;
pub const SJDB_SCORE: u32 = 1;

// collections
pub const SIGNAL_CATEGORIES: &[&str] = &["Unique", "UniqueMultiple"];
pub const STRANDED_TRACKS: &[(u8, &str)] = &[(1, "minus"), (2, "plus")];
pub const UNSTRANDED_TRACKS: &[(u8, &str)] = &[(1, "unstranded")];
pub const DATA_TYPES: &[&str] = &["str_SE", "str_PE", "unstr_SE", "unstr_PE"];
