//! Streaming decoder for castxml's XML output.
//!
//! castxml emits a flat-ish document with one element per declaration. Only
//! `<Function>` elements (and their `<Argument>`/`<Ellipsis>` children) are
//! kept; `<File>` elements are read to resolve file ids to paths. Everything
//! else is skipped, but the document must still be well formed.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::model::{CArgument, CFunction, CFunctionSet, ModelError};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read AST payload: {0}")]
    Io(#[from] io::Error),
    #[error("malformed AST payload at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },
    #[error("malformed attribute at byte {position}: {source}")]
    Attr {
        position: u64,
        #[source]
        source: AttrError,
    },
    #[error("mismatched end tag </{found}> at byte {position}, expected </{expected}>")]
    MismatchedEndTag { expected: String, found: String, position: u64 },
    #[error("unclosed element <{0}> at end of AST payload")]
    UnclosedElement(String),
    #[error("AST payload contains no root element")]
    NoRootElement,
    #[error("second root element <{0}> at byte {1}")]
    MultipleRoots(String, u64),
    #[error("function element #{index} has invalid {attribute}=\"{value}\"")]
    InvalidAttribute { index: usize, attribute: &'static str, value: String },
    #[error(transparent)]
    Invalid(#[from] ModelError),
}

/// Decode castxml output held in memory.
pub fn parse_c_functions(xml: &[u8]) -> Result<CFunctionSet, DecodeError> {
    parse_c_functions_from_reader(xml)
}

/// Decode castxml output saved to a file.
pub fn parse_c_functions_from_file(path: &Path) -> Result<CFunctionSet, DecodeError> {
    let file = File::open(path)?;
    parse_c_functions_from_reader(BufReader::new(file))
}

/// Decode castxml output from any buffered reader.
pub fn parse_c_functions_from_reader<R: BufRead>(reader: R) -> Result<CFunctionSet, DecodeError> {
    let raw = FunctionCollector::default().run(reader)?;
    Ok(CFunctionSet::ensure(raw)?)
}

#[derive(Default)]
struct FunctionCollector {
    stack: Vec<String>,
    saw_root: bool,
    /// Function currently open, with the stack depth of its start tag.
    current: Option<(usize, CFunction)>,
    functions: Vec<CFunction>,
    files: HashMap<String, String>,
}

impl FunctionCollector {
    fn run<R: BufRead>(mut self, reader: R) -> Result<Vec<CFunction>, DecodeError> {
        let mut reader = Reader::from_reader(reader);
        let mut buf = Vec::new();
        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|source| DecodeError::Xml { position, source })?;
            match event {
                Event::Start(e) => {
                    self.open(&e, position, false)?;
                    self.stack.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                }
                Event::Empty(e) => self.open(&e, position, true)?,
                Event::End(e) => {
                    let found = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    match self.stack.pop() {
                        Some(expected) if expected == found => {}
                        Some(expected) => {
                            return Err(DecodeError::MismatchedEndTag { expected, found, position })
                        }
                        None => {
                            return Err(DecodeError::MismatchedEndTag {
                                expected: String::new(),
                                found,
                                position,
                            })
                        }
                    }
                    if matches!(&self.current, Some((depth, _)) if *depth == self.stack.len()) {
                        if let Some((_, function)) = self.current.take() {
                            self.functions.push(function);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = self.stack.pop() {
            return Err(DecodeError::UnclosedElement(open));
        }
        if !self.saw_root {
            return Err(DecodeError::NoRootElement);
        }

        let FunctionCollector { mut functions, files, .. } = self;
        for function in &mut functions {
            if let Some(path) = function.file.as_ref().and_then(|id| files.get(id)) {
                function.file = Some(path.clone());
            }
        }
        Ok(functions)
    }

    fn open(&mut self, e: &BytesStart<'_>, position: u64, empty: bool) -> Result<(), DecodeError> {
        if self.stack.is_empty() && self.saw_root {
            let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
            return Err(DecodeError::MultipleRoots(name, position));
        }
        self.saw_root = true;
        let depth = self.stack.len();
        match e.name().as_ref() {
            b"Function" if self.current.is_none() => {
                let function = self.read_function(e, position)?;
                if empty {
                    self.functions.push(function);
                } else {
                    self.current = Some((depth, function));
                }
            }
            b"Argument" => {
                if let Some((fdepth, function)) = self.current.as_mut() {
                    if *fdepth + 1 == depth {
                        let mut arg = CArgument::default();
                        for (key, value) in attributes(e, position)? {
                            match key.as_slice() {
                                b"name" => arg.name = Some(value),
                                b"type" => arg.type_id = Some(value),
                                _ => {}
                            }
                        }
                        function.arguments.push(arg);
                    }
                }
            }
            b"Ellipsis" => {
                if let Some((fdepth, function)) = self.current.as_mut() {
                    if *fdepth + 1 == depth {
                        function.variadic = true;
                    }
                }
            }
            b"File" => {
                let attrs = attributes(e, position)?;
                let id = attrs.iter().find(|(k, _)| k == b"id").map(|(_, v)| v.clone());
                let name = attrs.into_iter().find(|(k, _)| k == b"name").map(|(_, v)| v);
                if let (Some(id), Some(name)) = (id, name) {
                    self.files.insert(id, name);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn read_function(&self, e: &BytesStart<'_>, position: u64) -> Result<CFunction, DecodeError> {
        let index = self.functions.len();
        let mut function = CFunction::default();
        let mut location = None;
        for (key, value) in attributes(e, position)? {
            match key.as_slice() {
                b"name" => function.name = value,
                b"id" => function.id = Some(value),
                b"returns" => function.returns = Some(value),
                b"file" => function.file = Some(value),
                b"line" => function.line = Some(parse_line(index, "line", &value)?),
                b"location" => location = Some(value),
                b"extern" => function.is_extern = value == "1",
                b"inline" => function.is_inline = value == "1",
                b"static" => function.is_static = value == "1",
                _ => {}
            }
        }
        if function.line.is_none() {
            if let Some(location) = location {
                // castxml writes `fN:LINE`.
                if let Some((file, line)) = location.rsplit_once(':') {
                    function.line = Some(parse_line(index, "location", line)?);
                    if function.file.is_none() {
                        function.file = Some(file.to_string());
                    }
                }
            }
        }
        Ok(function)
    }
}

fn attributes(e: &BytesStart<'_>, position: u64) -> Result<Vec<(Vec<u8>, String)>, DecodeError> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|source| DecodeError::Attr { position, source })?;
        let value: Cow<'_, str> =
            attr.unescape_value().map_err(|source| DecodeError::Xml { position, source })?;
        out.push((attr.key.as_ref().to_vec(), value.into_owned()));
    }
    Ok(out)
}

fn parse_line(index: usize, attribute: &'static str, value: &str) -> Result<u32, DecodeError> {
    value.parse().map_err(|_| DecodeError::InvalidAttribute {
        index,
        attribute,
        value: value.to_string(),
    })
}
