use crate::{Channel, ChannelKind, Error, Joint, MotionDocument, ParseWarning};
use glam::DVec3;
use std::collections::HashMap;
use std::str::SplitInclusive;

const SEPARATORS: [char; 4] = [' ', ':', ',', '\t'];

fn tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(SEPARATORS).filter(|t| !t.is_empty())
}

fn trim_line_end(raw: &str) -> &str {
    raw.trim_end_matches(['\r', '\n'])
}

struct LineReader<'a> {
    lines: SplitInclusive<'a, char>,
    line_no: usize,
    warnings: Vec<ParseWarning>,
}

impl<'a> LineReader<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            lines: input.split_inclusive('\n'),
            line_no: 0,
            warnings: Vec::new(),
        }
    }

    /// Next raw line, line ending included.
    fn next_raw(&mut self) -> Option<(usize, &'a str)> {
        let raw = self.lines.next()?;
        self.line_no += 1;
        Some((self.line_no, raw))
    }

    fn next_content_line(&mut self) -> Option<(usize, &'a str)> {
        loop {
            let (line_no, raw) = self.next_raw()?;
            let line = trim_line_end(raw);
            if tokens(line).next().is_some() {
                return Some((line_no, line));
            }
        }
    }

    fn warn(&mut self, line: usize, token: &str, context: &'static str) {
        let warning = ParseWarning {
            line,
            token: token.to_string(),
            context,
        };
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Missing tokens read as zero silently; unparsable ones are recorded.
    fn number(&mut self, line: usize, token: Option<&str>, context: &'static str) -> f64 {
        let Some(token) = token else {
            return 0.0;
        };
        match token.parse::<f64>() {
            Ok(value) => value,
            Err(_) => {
                self.warn(line, token, context);
                0.0
            }
        }
    }

    fn count(&mut self, line: usize, token: &str, context: &'static str) -> usize {
        match token.parse::<usize>() {
            Ok(value) => value,
            Err(_) => {
                self.warn(line, token, context);
                0
            }
        }
    }

    fn vec3<'t>(
        &mut self,
        line: usize,
        tokens: &mut impl Iterator<Item = &'t str>,
        context: &'static str,
    ) -> DVec3 {
        let x = self.number(line, tokens.next(), context);
        let y = self.number(line, tokens.next(), context);
        let z = self.number(line, tokens.next(), context);
        DVec3::new(x, y, z)
    }
}

struct Hierarchy {
    header: String,
    joints: Vec<Joint>,
    channels: Vec<Channel>,
    joint_index: HashMap<String, usize>,
}

pub(crate) fn parse_document(input: &str) -> Result<MotionDocument, Error> {
    let mut reader = LineReader::new(input);
    let hierarchy = parse_hierarchy(&mut reader)?;
    let num_channels = hierarchy.channels.len();
    let (num_frames, interval, motion) = parse_motion(&mut reader, num_channels)?;

    log::debug!(
        "parsed {} joint(s), {} channel(s), {} frame(s) at {}s",
        hierarchy.joints.len(),
        num_channels,
        num_frames,
        interval
    );

    Ok(MotionDocument {
        file_name: String::new(),
        motion_name: String::new(),
        is_load_success: true,
        header: hierarchy.header,
        joints: hierarchy.joints,
        channels: hierarchy.channels,
        joint_index: hierarchy.joint_index,
        num_frames,
        interval,
        motion,
        keyframes: Vec::new(),
        warnings: reader.warnings,
    })
}

/// Everything after the keyword on a `ROOT`/`JOINT` line, so names may contain separators.
fn joint_name<'l>(line: &'l str, keyword: &str) -> &'l str {
    let start = line.find(keyword).map(|i| i + keyword.len()).unwrap_or(0);
    line[start..].trim_start_matches(SEPARATORS).trim_end()
}

fn parse_hierarchy(reader: &mut LineReader<'_>) -> Result<Hierarchy, Error> {
    let mut header = String::new();
    let mut joints: Vec<Joint> = Vec::new();
    let mut channels: Vec<Channel> = Vec::new();
    let mut joint_index = HashMap::new();

    // Joint that was active before each open brace.
    let mut stack: Vec<Option<usize>> = Vec::new();
    let mut current: Option<usize> = None;
    // Joint that becomes active at the next `{`.
    let mut pending: Option<usize> = None;
    let mut in_site = false;

    loop {
        let Some((line_no, raw)) = reader.next_raw() else {
            return Err(Error::UnexpectedEof {
                context: "hierarchy (no MOTION section)".to_string(),
            });
        };
        let line = trim_line_end(raw);
        let mut line_tokens = tokens(line);
        let Some(keyword) = line_tokens.next() else {
            header.push_str(raw);
            continue;
        };

        if keyword == "MOTION" {
            if !stack.is_empty() {
                return Err(Error::UnclosedHierarchy {
                    line: line_no,
                    depth: stack.len(),
                });
            }
            break;
        }
        header.push_str(raw);

        match keyword {
            "{" => {
                stack.push(current);
                current = pending;
            }
            "}" => {
                let Some(parent) = stack.pop() else {
                    return Err(Error::UnbalancedBrace { line: line_no });
                };
                current = parent;
                in_site = false;
            }
            "ROOT" | "JOINT" => {
                let name = joint_name(line, keyword);
                if name.is_empty() {
                    return Err(Error::Malformed {
                        line: line_no,
                        message: format!("{keyword} without a name"),
                    });
                }
                if current.is_none() && !joints.is_empty() {
                    return Err(Error::MultipleRoots {
                        line: line_no,
                        name: name.to_string(),
                    });
                }

                let index = joints.len();
                joints.push(Joint::new(name.to_string(), index, current));
                if let Some(parent) = current {
                    joints[parent].children.push(index);
                }
                if let Some(previous) = joint_index.insert(name.to_string(), index) {
                    log::warn!(
                        "line {line_no}: duplicate joint name '{name}', lookups now resolve to joint {index} instead of {previous}"
                    );
                }
                pending = Some(index);
            }
            "End" => {
                pending = current;
                in_site = true;
            }
            "OFFSET" => {
                let Some(joint) = current else {
                    return Err(Error::Malformed {
                        line: line_no,
                        message: "OFFSET outside of a joint".to_string(),
                    });
                };
                if in_site {
                    let site = reader.vec3(line_no, &mut line_tokens, "site offset");
                    joints[joint].site = Some(site);
                } else {
                    joints[joint].offset = reader.vec3(line_no, &mut line_tokens, "offset");
                }
            }
            "CHANNELS" => {
                let Some(joint) = current else {
                    return Err(Error::Malformed {
                        line: line_no,
                        message: "CHANNELS outside of a joint".to_string(),
                    });
                };
                let count = match line_tokens.next() {
                    Some(token) => reader.count(line_no, token, "channel count"),
                    None => 0,
                };
                for declared in 0..count {
                    let Some(token) = line_tokens.next() else {
                        return Err(Error::Malformed {
                            line: line_no,
                            message: format!(
                                "CHANNELS declares {count} channel(s) but lists {declared}"
                            ),
                        });
                    };
                    let kind = ChannelKind::from_token(token).ok_or_else(|| {
                        Error::UnknownChannel {
                            line: line_no,
                            token: token.to_string(),
                        }
                    })?;
                    let index = channels.len();
                    channels.push(Channel { joint, kind, index });
                    joints[joint].channels.push(index);
                }
            }
            _ => {}
        }
    }

    if joints.is_empty() {
        return Err(Error::MissingRoot);
    }

    Ok(Hierarchy {
        header,
        joints,
        channels,
        joint_index,
    })
}

fn parse_motion(
    reader: &mut LineReader<'_>,
    num_channels: usize,
) -> Result<(usize, f64, Vec<f64>), Error> {
    let (line_no, line) = reader
        .next_content_line()
        .ok_or_else(|| Error::UnexpectedEof {
            context: "Frames".to_string(),
        })?;
    let mut line_tokens = tokens(line);
    let keyword = line_tokens.next().unwrap_or_default();
    if keyword != "Frames" {
        return Err(Error::MissingKeyword {
            line: line_no,
            expected: "Frames".to_string(),
            found: keyword.to_string(),
        });
    }
    let Some(token) = line_tokens.next() else {
        return Err(Error::Malformed {
            line: line_no,
            message: "Frames without a count".to_string(),
        });
    };
    let num_frames = reader.count(line_no, token, "frame count");

    let (line_no, line) = reader
        .next_content_line()
        .ok_or_else(|| Error::UnexpectedEof {
            context: "Frame Time".to_string(),
        })?;
    let (key, value) = line.split_once(':').unwrap_or((line, ""));
    let key = key.trim();
    if key != "Frame Time" {
        return Err(Error::MissingKeyword {
            line: line_no,
            expected: "Frame Time".to_string(),
            found: key.to_string(),
        });
    }
    let Some(token) = tokens(value).next() else {
        return Err(Error::Malformed {
            line: line_no,
            message: "Frame Time without a value".to_string(),
        });
    };
    let interval = reader.number(line_no, Some(token), "frame time");

    let mut motion = Vec::new();
    if num_channels == 0 {
        return Ok((num_frames, interval, motion));
    }
    for frame in 0..num_frames {
        let Some((line_no, raw)) = reader.next_raw() else {
            return Err(Error::ShortMotionRow {
                frame,
                expected: num_channels,
                found: 0,
            });
        };
        let mut found = 0;
        for token in tokens(trim_line_end(raw)).take(num_channels) {
            let value = reader.number(line_no, Some(token), "motion value");
            motion.push(value);
            found += 1;
        }
        if found < num_channels {
            return Err(Error::ShortMotionRow {
                frame,
                expected: num_channels,
                found,
            });
        }
    }

    Ok((num_frames, interval, motion))
}
