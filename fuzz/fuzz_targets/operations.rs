#![no_main]
use libfuzzer_sys::fuzz_target;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use xmlser::XmlSerializer;

const NAMES: [&str; 4] = ["a", "b", "item", "x-y"];
const URIS: [Option<&str>; 5] = [None, Some(""), Some("urn:a"), Some("urn:b"), Some("urn:a")];
const PREFIXES: [&str; 4] = ["", "p", "ns1", "q"];
const TEXTS: [&str; 6] = ["", "plain", "a&b<c>d", "\r\n\t", "]]>", "x--y-"];

/// Ein Byte waehlt die Operation, das naechste die Argumente.
fn drive(ser: &mut XmlSerializer<'_>, data: &[u8]) -> xmlser::Result<()> {
    let mut open: Vec<(Option<&str>, &str)> = Vec::new();
    for pair in data.chunks(2) {
        let op = pair[0];
        let arg = usize::from(pair.get(1).copied().unwrap_or(0));
        let name = NAMES[arg % NAMES.len()];
        let uri = URIS[(arg / 4) % URIS.len()];
        let text = TEXTS[arg % TEXTS.len()];
        match op % 12 {
            0 | 1 => {
                ser.start_tag(uri, name)?;
                open.push((uri, name));
            }
            2 => {
                ser.attribute(uri, name, text)?;
            }
            3 => {
                let (uri, name) = open.last().copied().unwrap_or((uri, name));
                ser.end_tag(uri, name)?;
                open.pop();
            }
            4 => {
                ser.text(text)?;
            }
            5 => ser.cdsect(text)?,
            6 => ser.comment(text)?,
            7 => ser.processing_instruction(if text.is_empty() { "pi" } else { "pi data" })?,
            8 => ser.set_prefix(PREFIXES[arg % PREFIXES.len()], uri.unwrap_or("urn:p"))?,
            9 => ser.ignorable_whitespace(if arg % 2 == 0 { " \n" } else { text })?,
            10 => {
                ser.get_prefix(uri.unwrap_or(""), arg % 2 == 0)?;
            }
            _ => ser.flush()?,
        }
    }
    ser.end_document()
}

fuzz_target!(|data: &[u8]| {
    let mut out = String::new();
    let ok = {
        let mut ser = XmlSerializer::new();
        ser.set_output_writer(&mut out).is_ok() && drive(&mut ser, data).is_ok()
    };
    if !ok {
        return;
    }

    let mut reader = NsReader::from_str(&out);
    loop {
        match reader.read_resolved_event() {
            Ok((ResolveResult::Unknown(p), _)) => {
                panic!("undeclared prefix {:?} in {out:?}", String::from_utf8_lossy(&p))
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(e) => panic!("not well-formed: {e} in {out:?}"),
        }
    }
});
