use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::{consts::*, error::PipelineError};

/// A bedGraph line keyed for sorting
struct Interval<'a> {
    chrom: &'a [u8],
    start: u64,
    line: &'a [u8],
}

/// Keep the primary-chromosome lines of a bedGraph and sort them by
/// chromosome (byte order), then numeric start, then the whole line.
///
/// # Arguments
/// * `data` - Raw bedGraph bytes
/// * `context` - Name used in parse errors
///
/// # Returns
/// The kept lines, sorted, without line terminators
///
/// # Example
/// ```rust, no_run
/// let data = b"chr2\t5\t9\t1\nchrUn_x\t0\t4\t1\nchr1\t10\t20\t2\n";
/// let lines = sort_lines(data, "Signal.Unique.str1.out.bg")?;
///
/// assert_eq!(lines, vec![&b"chr1\t10\t20\t2"[..], &b"chr2\t5\t9\t1"[..]]);
/// ```
pub fn sort_lines<'a>(data: &'a [u8], context: &str) -> Result<Vec<&'a [u8]>, PipelineError> {
    let mut intervals = Vec::new();

    for (idx, line) in data.split(|b| *b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if !line.starts_with(PRIMARY_CHROM_PREFIX.as_bytes()) {
            continue;
        }

        let fields = line.split(|b| *b == b'\t').collect::<Vec<_>>();
        if fields.len() < 4 {
            return Err(PipelineError::parse(
                context,
                format!("line {} has {} fields, expected 4", idx + 1, fields.len()),
            ));
        }

        let start = std::str::from_utf8(fields[1])
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| {
                PipelineError::parse(
                    context,
                    format!(
                        "line {} has a non-numeric start: {:?}",
                        idx + 1,
                        String::from_utf8_lossy(fields[1])
                    ),
                )
            })?;

        intervals.push(Interval {
            chrom: fields[0],
            start,
            line,
        });
    }

    intervals.sort_unstable_by(|a, b| {
        a.chrom
            .cmp(b.chrom)
            .then(a.start.cmp(&b.start))
            .then(a.line.cmp(b.line))
    });

    Ok(intervals.into_iter().map(|i| i.line).collect())
}

/// Filter and sort a bedGraph file into `dst`
///
/// # Returns
/// The number of lines written
pub fn sort_bedgraph(src: &Path, dst: &Path) -> Result<usize, PipelineError> {
    let file = File::open(src)?;
    let context = src.display().to_string();
    let mut writer = BufWriter::new(File::create(dst)?);

    // WARN: mapping an empty file fails on some platforms
    if file.metadata()?.len() == 0 {
        writer.flush()?;
        return Ok(0);
    }

    let mmap = unsafe { Mmap::map(&file)? };
    let lines = sort_lines(&mmap, &context)?;

    for line in &lines {
        writer.write_all(line)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    Ok(lines.len())
}

/// Keep only the primary chromosomes of a STAR chrNameLength.txt
///
/// # Example
/// ```rust, no_run
/// let kept = filter_chrom_sizes(&genome.join("chrNameLength.txt"), &outdir.join("chrNL.txt"))?;
/// ```
pub fn filter_chrom_sizes(src: &Path, dst: &Path) -> Result<usize, PipelineError> {
    let contents = std::fs::read_to_string(src)?;
    let mut writer = BufWriter::new(File::create(dst)?);
    let mut kept = 0;

    for line in contents
        .lines()
        .filter(|l| l.starts_with(PRIMARY_CHROM_PREFIX))
    {
        writeln!(writer, "{}", line)?;
        kept += 1;
    }
    writer.flush()?;

    Ok(kept)
}
