//! Program loading and tokenizing (§4.6 "executes scripts/NC programs";
//! §9 resolves the out-of-scope NC interpreter seam by taking pre-tokenized
//! text records as input, see `DESIGN.md`).
//!
//! A program file is a sequence of line-oriented records, one per line,
//! blank lines and `#`-prefixed comments ignored:
//!
//! ```text
//! DELAY <seconds>
//! WAIT_MOTION
//! WAIT_TOOL
//! MOVE_JOINT <j0> [j1 ...] [T <seconds>]
//! MOVE_WORLD <x> <y> <z> <qw> <qx> <qy> <qz> [T <seconds>]
//! TOOL_ON <id> <value>
//! TOOL_OFF <id>
//! ```

use std::path::{Path, PathBuf};

use gomotion_common::consts::MAX_JOINTS;
use gomotion_common::pose::{Pose, Quat, Vec3};
use thiserror::Error;

use crate::interp::InterpRecord;

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("program '{name}' not found under {dir}")]
    NotFound { dir: String, name: String },
    #[error("program '{name}' escapes the configured program directory")]
    PathEscape { name: String },
    #[error("I/O error reading program '{name}': {source}")]
    Io { name: String, #[source] source: std::io::Error },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// A fully-tokenized program, pulled into the interp list record-by-record
/// as back-pressure allows (§4.6).
pub struct Program {
    name: String,
    records: Vec<InterpRecord>,
    cursor: usize,
}

impl Program {
    /// Resolve `name` under `prog_dir`, refusing any path that escapes it
    /// (§6 `PROG_DIR`), and tokenize its contents.
    pub fn load(prog_dir: &Path, name: &str) -> Result<Self, ProgramError> {
        let candidate = prog_dir.join(name);
        let canonical_dir = prog_dir
            .canonicalize()
            .map_err(|source| ProgramError::Io { name: name.to_string(), source })?;
        let canonical_file = candidate
            .canonicalize()
            .map_err(|_| ProgramError::NotFound { dir: prog_dir.display().to_string(), name: name.to_string() })?;
        if !canonical_file.starts_with(&canonical_dir) {
            return Err(ProgramError::PathEscape { name: name.to_string() });
        }

        let text = std::fs::read_to_string(&canonical_file)
            .map_err(|source| ProgramError::Io { name: name.to_string(), source })?;
        let records = parse(&text)?;
        Ok(Self { name: name.to_string(), records, cursor: 0 })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.records.len()
    }

    pub fn total_records(&self) -> usize {
        self.records.len()
    }

    /// Pull the next record, if any (§4.6: the cycle driver feeds these
    /// into the interp list while it is below half capacity).
    pub fn next_record(&mut self) -> Option<InterpRecord> {
        let r = self.records.get(self.cursor).copied();
        if r.is_some() {
            self.cursor += 1;
        }
        r
    }
}

pub fn default_program_path(prog_dir: &str, name: &str) -> PathBuf {
    Path::new(prog_dir).join(name)
}

fn parse(text: &str) -> Result<Vec<InterpRecord>, ProgramError> {
    let mut out = Vec::new();
    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let record = parse_line(line_no, &tokens)?;
        out.push(record);
    }
    Ok(out)
}

fn parse_f64(line: usize, tok: &str) -> Result<f64, ProgramError> {
    tok.parse::<f64>().map_err(|_| ProgramError::Parse { line, message: format!("'{tok}' is not a number") })
}

fn parse_u32(line: usize, tok: &str) -> Result<u32, ProgramError> {
    tok.parse::<u32>().map_err(|_| ProgramError::Parse { line, message: format!("'{tok}' is not an integer") })
}

fn parse_line(line: usize, tokens: &[&str]) -> Result<InterpRecord, ProgramError> {
    match tokens.first().copied() {
        Some("DELAY") => {
            let secs = tokens
                .get(1)
                .ok_or_else(|| ProgramError::Parse { line, message: "DELAY requires a duration".into() })?;
            Ok(InterpRecord::Delay(parse_f64(line, secs)?))
        }
        Some("WAIT_MOTION") => Ok(InterpRecord::WaitMotion),
        Some("WAIT_TOOL") => Ok(InterpRecord::WaitTool),
        Some("TOOL_ON") => {
            let id = tokens.get(1).ok_or_else(|| ProgramError::Parse { line, message: "TOOL_ON requires an id".into() })?;
            let value = tokens
                .get(2)
                .ok_or_else(|| ProgramError::Parse { line, message: "TOOL_ON requires a value".into() })?;
            Ok(InterpRecord::ToolOn { id: parse_u32(line, id)?, value: parse_f64(line, value)? })
        }
        Some("TOOL_OFF") => {
            let id = tokens.get(1).ok_or_else(|| ProgramError::Parse { line, message: "TOOL_OFF requires an id".into() })?;
            Ok(InterpRecord::ToolOff { id: parse_u32(line, id)? })
        }
        Some("MOVE_JOINT") => {
            let (values_tokens, time_override) = split_time_override(line, &tokens[1..])?;
            if values_tokens.is_empty() || values_tokens.len() > MAX_JOINTS {
                return Err(ProgramError::Parse {
                    line,
                    message: format!("MOVE_JOINT takes 1..={MAX_JOINTS} joint values"),
                });
            }
            let mut joints = [0.0; MAX_JOINTS];
            for (i, tok) in values_tokens.iter().enumerate() {
                joints[i] = parse_f64(line, tok)?;
            }
            Ok(InterpRecord::MoveJoint { joints, n: values_tokens.len(), time_override })
        }
        Some("MOVE_WORLD") => {
            let (values_tokens, time_override) = split_time_override(line, &tokens[1..])?;
            if values_tokens.len() != 7 {
                return Err(ProgramError::Parse {
                    line,
                    message: "MOVE_WORLD requires x y z qw qx qy qz".into(),
                });
            }
            let mut v = [0.0; 7];
            for (i, tok) in values_tokens.iter().enumerate() {
                v[i] = parse_f64(line, tok)?;
            }
            let pose = Pose::new(Vec3::new(v[0], v[1], v[2]), Quat::new(v[3], v[4], v[5], v[6]).normalized());
            Ok(InterpRecord::MoveWorld { pose, time_override })
        }
        Some(other) => Err(ProgramError::Parse { line, message: format!("unknown record type '{other}'") }),
        None => unreachable!("blank lines are filtered before parse_line"),
    }
}

/// Split an optional trailing `T <seconds>` time-override suffix off a
/// move record's value tokens.
fn split_time_override<'a>(line: usize, tokens: &[&'a str]) -> Result<(Vec<&'a str>, Option<f64>), ProgramError> {
    if let Some(pos) = tokens.iter().position(|t| *t == "T") {
        let secs = tokens
            .get(pos + 1)
            .ok_or_else(|| ProgramError::Parse { line, message: "T requires a duration".into() })?;
        Ok((tokens[..pos].to_vec(), Some(parse_f64(line, secs)?)))
    } else {
        Ok((tokens.to_vec(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_program(dir: &tempfile::TempDir, name: &str, body: &str) {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn parses_all_record_kinds() {
        let dir = tempfile::tempdir().unwrap();
        write_program(
            &dir,
            "part1.ngc",
            "# comment\n\nDELAY 0.5\nWAIT_MOTION\nWAIT_TOOL\nTOOL_ON 1 1.0\nTOOL_OFF 1\n\
             MOVE_JOINT 0.1 0.2 T 2.0\nMOVE_WORLD 1 2 3 1 0 0 0\n",
        );
        let mut prog = Program::load(dir.path(), "part1.ngc").unwrap();
        assert_eq!(prog.total_records(), 7);
        assert_eq!(prog.next_record(), Some(InterpRecord::Delay(0.5)));
        assert_eq!(prog.next_record(), Some(InterpRecord::WaitMotion));
        assert_eq!(prog.next_record(), Some(InterpRecord::WaitTool));
        assert_eq!(prog.next_record(), Some(InterpRecord::ToolOn { id: 1, value: 1.0 }));
        assert_eq!(prog.next_record(), Some(InterpRecord::ToolOff { id: 1 }));
        match prog.next_record().unwrap() {
            InterpRecord::MoveJoint { joints, n, time_override } => {
                assert_eq!(n, 2);
                assert_eq!(joints[0], 0.1);
                assert_eq!(time_override, Some(2.0));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(prog.next_record(), Some(InterpRecord::MoveWorld { .. })));
        assert!(prog.is_exhausted());
    }

    #[test]
    fn missing_program_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Program::load(dir.path(), "missing.ngc");
        assert!(matches!(err, Err(ProgramError::NotFound { .. } | ProgramError::Io { .. })));
    }

    #[test]
    fn path_escape_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_program(&dir, "ok.ngc", "WAIT_MOTION\n");
        // `..` cannot canonicalize past the temp dir's parent in a way that
        // stays inside `dir`, so this must fail closed.
        let err = Program::load(dir.path(), "../ok.ngc");
        assert!(err.is_err());
    }

    #[test]
    fn unknown_record_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write_program(&dir, "bad.ngc", "FROBNICATE\n");
        let err = Program::load(dir.path(), "bad.ngc");
        assert!(matches!(err, Err(ProgramError::Parse { .. })));
    }
}
