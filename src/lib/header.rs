//! `@PG` records for output headers.
//!
//! Each run appends one program record named `fraguniq`, chained through `PP`
//! to the last program already in the header. A taken ID gets a numeric
//! suffix (`fraguniq.1`, `fraguniq.2`, ...).
//!
//! Also checks the `@HD` sort order.

use anyhow::Result;
use bstr::{BString, ByteSlice};
use noodles::sam::Header;
use noodles::sam::header::record::value::Map;
use noodles::sam::header::record::value::map::Program;
use noodles::sam::header::record::value::map::header::tag::SORT_ORDER;
use noodles::sam::header::record::value::map::program::tag;
use std::collections::HashSet;

/// Program name and base `@PG` ID.
pub const PROGRAM_NAME: &str = "fraguniq";

/// True when `@HD` declares `SO:coordinate`.
#[must_use]
pub fn is_coordinate_sorted(header: &Header) -> bool {
    header
        .header()
        .and_then(|hd| hd.other_fields().get(&SORT_ORDER))
        .is_some_and(|so| so.as_slice() == b"coordinate")
}

/// ID of the program no other program names as its `PP`, i.e. the end of the
/// chain.
#[must_use]
pub fn last_program_id(header: &Header) -> Option<String> {
    let programs = header.programs();
    let programs = programs.as_ref();
    let referenced: HashSet<&[u8]> = programs
        .values()
        .filter_map(|pg| pg.other_fields().get(&tag::PREVIOUS_PROGRAM_ID))
        .map(|pp| pp.as_ref())
        .collect();

    programs
        .keys()
        .find(|id| !referenced.contains(id.as_slice()))
        .or_else(|| programs.keys().next())
        .map(|id| id.to_str_lossy().into_owned())
}

/// `base_id`, or the first `base_id.N` not already used.
#[must_use]
pub fn unique_program_id(header: &Header, base_id: &str) -> String {
    let programs = header.programs();
    let programs = programs.as_ref();
    std::iter::once(base_id.to_string())
        .chain((1..).map(|i| format!("{base_id}.{i}")))
        .find(|candidate| !programs.contains_key(candidate.as_bytes()))
        .unwrap_or_else(|| base_id.to_string())
}

/// Append a `fraguniq` `@PG` record to `header`.
///
/// # Errors
/// Returns an error if the record cannot be built or added.
pub fn add_program_record(mut header: Header, version: &str, command_line: &str) -> Result<Header> {
    let mut builder = Map::<Program>::builder()
        .insert(tag::NAME, PROGRAM_NAME)
        .insert(tag::VERSION, version)
        .insert(tag::COMMAND_LINE, command_line);
    if let Some(pp) = last_program_id(&header) {
        builder = builder.insert(tag::PREVIOUS_PROGRAM_ID, pp);
    }
    let id = unique_program_id(&header, PROGRAM_NAME);
    header.programs_mut().add(BString::from(id), builder.build()?)?;
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_programs(ids: &[(&str, Option<&str>)]) -> Header {
        let mut header = Header::default();
        for &(id, pp) in ids {
            let mut builder = Map::<Program>::builder();
            if let Some(pp) = pp {
                builder = builder.insert(tag::PREVIOUS_PROGRAM_ID, pp);
            }
            header.programs_mut().add(BString::from(id), builder.build().unwrap()).unwrap();
        }
        header
    }

    #[test]
    fn test_is_coordinate_sorted() {
        use noodles::sam::header::record::value::map::Header as HeaderMap;

        assert!(!is_coordinate_sorted(&Header::default()));
        let hd = Map::<HeaderMap>::builder().insert(SORT_ORDER, "coordinate").build().unwrap();
        assert!(is_coordinate_sorted(&Header::builder().set_header(hd).build()));
        let hd = Map::<HeaderMap>::builder().insert(SORT_ORDER, "queryname").build().unwrap();
        assert!(!is_coordinate_sorted(&Header::builder().set_header(hd).build()));
    }

    #[test]
    fn test_last_program_id() {
        assert_eq!(last_program_id(&Header::default()), None);
        let header = with_programs(&[("bwa", None), ("samtools", Some("bwa"))]);
        assert_eq!(last_program_id(&header), Some("samtools".to_string()));
    }

    #[test]
    fn test_unique_program_id() {
        assert_eq!(unique_program_id(&Header::default(), "fraguniq"), "fraguniq");
        let header = with_programs(&[("fraguniq", None), ("fraguniq.1", Some("fraguniq"))]);
        assert_eq!(unique_program_id(&header, "fraguniq"), "fraguniq.2");
    }

    #[test]
    fn test_add_program_record_chains() {
        let header = with_programs(&[("bwa", None)]);
        let header = add_program_record(header, "0.1.0", "fraguniq uniq -i in.bam").unwrap();
        let programs = header.programs();
        let pg = programs.as_ref().get(b"fraguniq".as_slice()).unwrap();
        assert_eq!(
            pg.other_fields().get(&tag::PREVIOUS_PROGRAM_ID).map(std::convert::AsRef::as_ref),
            Some(b"bwa".as_slice())
        );
        assert_eq!(
            pg.other_fields().get(&tag::COMMAND_LINE).map(std::convert::AsRef::as_ref),
            Some(b"fraguniq uniq -i in.bam".as_slice())
        );
    }
}
