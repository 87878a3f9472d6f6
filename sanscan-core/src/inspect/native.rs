use std::fmt::Write as _;
use std::path::Path;

use goblin::elf::header::{machine_to_str, ET_CORE, ET_DYN, ET_EXEC, ET_REL};
use goblin::elf::sym::{bind_to_str, type_to_str, Symtab};
use goblin::elf::Elf;
use goblin::strtab::Strtab;
use goblin::Object;

use crate::inspect::{CommentExtractor, FileDescriber, MimeInspector, SymbolExtractor};
use crate::InspectError;

/// Reads binaries in-process with goblin; nothing is spawned.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeInspector;

impl NativeInspector {
    pub fn new() -> Self {
        Self
    }

    fn read(path: &Path) -> Result<Vec<u8>, InspectError> {
        std::fs::read(path).map_err(|e| InspectError::io(path, e))
    }

    fn parse_elf<'a>(path: &Path, buf: &'a [u8]) -> Result<Elf<'a>, InspectError> {
        match Object::parse(buf) {
            Ok(Object::Elf(elf)) => Ok(elf),
            Ok(_) => Err(InspectError::NotElf {
                path: path.to_path_buf(),
            }),
            Err(source) => Err(InspectError::Parse {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl MimeInspector for NativeInspector {
    fn mime_type(&self, path: &Path) -> Result<String, InspectError> {
        let buf = Self::read(path)?;
        if buf.is_empty() {
            return Ok("application/x-empty".to_string());
        }

        let mime = match infer::get(&buf) {
            // infer reports every ELF as an executable; the header tells
            // shared objects and relocatables apart.
            Some(kind) if kind.extension() == "elf" => match Elf::parse_header(&buf) {
                Ok(header) => elf_mime(header.e_type).to_string(),
                Err(_) => kind.mime_type().to_string(),
            },
            Some(kind) => kind.mime_type().to_string(),
            None if std::str::from_utf8(&buf).is_ok() => "text/plain".to_string(),
            None => "application/octet-stream".to_string(),
        };
        log::debug!("{}: mime type {}", path.display(), mime);
        Ok(mime)
    }
}

fn elf_mime(e_type: u16) -> &'static str {
    match e_type {
        ET_EXEC => "application/x-executable",
        ET_DYN => "application/x-sharedlib",
        ET_REL => "application/x-object",
        ET_CORE => "application/x-coredump",
        _ => "application/octet-stream",
    }
}

impl FileDescriber for NativeInspector {
    fn describe(&self, path: &Path) -> Result<String, InspectError> {
        let buf = Self::read(path)?;
        let description = match Object::parse(&buf) {
            Ok(Object::Elf(elf)) => describe_elf(&elf),
            Ok(Object::PE(pe)) => {
                let class = if pe.is_64 { "PE32+" } else { "PE32" };
                let kind = if pe.is_lib { "DLL" } else { "executable" };
                format!("{class} {kind}")
            }
            Ok(Object::Mach(_)) => "Mach-O binary".to_string(),
            Ok(Object::Archive(_)) => "current ar archive".to_string(),
            _ if buf.is_empty() => "empty".to_string(),
            _ if buf.is_ascii() => "ASCII text".to_string(),
            _ => "data".to_string(),
        };
        log::debug!("{}: {}", path.display(), description);
        Ok(description)
    }
}

fn describe_elf(elf: &Elf<'_>) -> String {
    let class = if elf.is_64 { "64-bit" } else { "32-bit" };
    let endian = if elf.little_endian { "LSB" } else { "MSB" };
    let kind = match elf.header.e_type {
        ET_EXEC => "executable",
        ET_DYN if elf.interpreter.is_some() => "pie executable",
        ET_DYN => "shared object",
        ET_REL => "relocatable",
        ET_CORE => "core file",
        _ => "unknown type",
    };
    let mut description = format!(
        "ELF {class} {endian} {kind}, {}",
        machine_to_str(elf.header.e_machine)
    );
    if elf.interpreter.is_some() {
        description.push_str(", dynamically linked");
    }
    if elf.syms.is_empty() {
        description.push_str(", stripped");
    }
    description
}

impl CommentExtractor for NativeInspector {
    fn comment_section(&self, path: &Path) -> Result<String, InspectError> {
        let buf = Self::read(path)?;
        let elf = Self::parse_elf(path, &buf)?;

        let Some(sh) = elf
            .section_headers
            .iter()
            .find(|sh| elf.shdr_strtab.get_at(sh.sh_name) == Some(".comment"))
        else {
            log::warn!("{}: no .comment section", path.display());
            return Ok(String::new());
        };

        let start = sh.sh_offset as usize;
        let data = start
            .checked_add(sh.sh_size as usize)
            .and_then(|end| buf.get(start..end))
            .ok_or_else(|| {
                InspectError::io(
                    path,
                    std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        ".comment section extends past end of file",
                    ),
                )
            })?;

        let lines: Vec<String> = data
            .split(|&b| b == 0)
            .filter(|s| !s.is_empty())
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect();
        Ok(lines.join("\n"))
    }
}

impl SymbolExtractor for NativeInspector {
    fn symbol_table(&self, path: &Path) -> Result<String, InspectError> {
        let buf = Self::read(path)?;
        let elf = Self::parse_elf(path, &buf)?;

        let mut out = String::new();
        dump_symbols(&mut out, ".dynsym", &elf.dynsyms, &elf.dynstrtab);
        dump_symbols(&mut out, ".symtab", &elf.syms, &elf.strtab);
        log::debug!(
            "{}: {} dynamic and {} static symbols",
            path.display(),
            elf.dynsyms.len(),
            elf.syms.len()
        );
        Ok(out)
    }
}

fn dump_symbols(out: &mut String, table: &str, syms: &Symtab<'_>, strtab: &Strtab<'_>) {
    if syms.is_empty() {
        return;
    }
    let _ = writeln!(out, "Symbol table '{table}' contains {} entries:", syms.len());
    for (i, sym) in syms.iter().enumerate() {
        let name = strtab.get_at(sym.st_name).unwrap_or("");
        let _ = writeln!(
            out,
            "{i:>6}: {:016x} {:>5} {:<7} {:<6} {name}",
            sym.st_value,
            sym.st_size,
            type_to_str(sym.st_type()),
            bind_to_str(sym.st_bind()),
        );
    }
}
