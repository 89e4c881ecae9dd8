//! Formatter Directives
//!
//! `# @formatter:off` ... `# @formatter:on` regions are lifted out of the
//! source before parsing and replaced by a single placeholder comment each.
//! After formatting, every placeholder line, whatever its indentation, is
//! swapped back for the original text of its region.

const OFF_DIRECTIVE: &str = "# @formatter:off";
const ON_DIRECTIVE: &str = "# @formatter:on";
const PLACEHOLDER_BASE: &str = "@beautysh-verbatim-region-";

/// Regions lifted out of one source
#[derive(Debug, Clone, Default)]
pub struct VerbatimRegions {
    marker: String,
    regions: Vec<String>,
    /// (line in the prepared source, lines folded into it)
    shifts: Vec<(usize, usize)>,
}

impl VerbatimRegions {
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Map a 1-based line of the prepared source back to the input
    pub fn original_line(&self, line: usize) -> usize {
        line + self
            .shifts
            .iter()
            .filter(|(at, _)| *at < line)
            .map(|(_, folded)| folded)
            .sum::<usize>()
    }

    /// Put the original region text back in place of each placeholder line
    pub fn restore(&self, formatted: &str) -> String {
        if self.regions.is_empty() {
            return formatted.to_string();
        }
        formatted
            .split('\n')
            .map(|line| self.region_for(line.trim()).unwrap_or(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn region_for(&self, line: &str) -> Option<&str> {
        let id = line.strip_prefix(&self.marker)?.parse::<usize>().ok()?;
        self.regions.get(id).map(String::as_str)
    }
}

/// Replace each verbatim region of `source` by a placeholder comment line.
/// A region left open runs to the end of the input.
pub fn extract_regions(source: &str) -> (String, VerbatimRegions) {
    let mut prefix = PLACEHOLDER_BASE.to_string();
    while source.contains(&prefix) {
        prefix.insert(0, '_');
    }
    let mut result = VerbatimRegions {
        marker: format!("# {}", prefix),
        ..Default::default()
    };

    let mut prepared = String::with_capacity(source.len());
    let mut buffer: Vec<&str> = Vec::new();
    let mut in_region = false;
    let mut line_no = 0;

    for raw in source.split_inclusive('\n') {
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        if !in_region {
            line_no += 1;
            if line.trim() == OFF_DIRECTIVE {
                in_region = true;
                buffer.push(line);
            } else {
                prepared.push_str(raw);
            }
            continue;
        }

        buffer.push(line);
        if line.trim() == ON_DIRECTIVE {
            close_region(&mut result, &mut prepared, &mut buffer, line_no, raw.ends_with('\n'));
            in_region = false;
        }
    }

    if in_region {
        let newline = source.ends_with('\n');
        close_region(&mut result, &mut prepared, &mut buffer, line_no, newline);
    }

    (prepared, result)
}

fn close_region(
    result: &mut VerbatimRegions,
    prepared: &mut String,
    buffer: &mut Vec<&str>,
    line_no: usize,
    newline: bool,
) {
    prepared.push_str(&result.marker);
    prepared.push_str(&result.regions.len().to_string());
    if newline {
        prepared.push('\n');
    }
    if buffer.len() > 1 {
        result.shifts.push((line_no, buffer.len() - 1));
    }
    result.regions.push(buffer.join("\n"));
    buffer.clear();
}
