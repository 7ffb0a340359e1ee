//! Memory graph analysis: regions, points-to edges, nesting report.

mod common;

use std::sync::Arc;

use common::cxx;
use common::Image;
use spelunk_core::graph::analyze;
use spelunk_core::value::{Member, TypeCategory, TypeDescriptor, TypeRef};
use spelunk_core::visit::Visitor;

/// A pointer type that points at its own kind (`Link = Link*`).
fn self_pointer() -> TypeRef
{
    let link = TypeDescriptor::new(TypeCategory::Pointer, Some("Link".to_string()), 8);
    link.set_target(Arc::clone(&link));
    link
}

#[test]
fn test_two_pointer_cycle_is_two_regions_two_edges()
{
    let mut img = Image::new(0x1000, 0x2000);
    // a at 0x1000 stores &b; b at 0x2000 stores &a
    img.write_u64(0x1000, 0x2000);
    img.write_u64(0x2000, 0x1000);

    let link = self_pointer();
    let graph = analyze(
        &Visitor::new(),
        vec![
            ("a".to_string(), img.value(0x1000, Arc::clone(&link))),
            ("b".to_string(), img.value(0x2000, link)),
        ],
    );

    assert_eq!(graph.region_count(), 2);
    assert_eq!(graph.edge_count(), 2);
    assert!(graph.has_edge(0x1000, 0x2000));
    assert!(graph.has_edge(0x2000, 0x1000));
}

#[test]
fn test_regions_keep_their_first_name()
{
    let mut img = Image::new(0x1000, 0x2000);
    img.write_u64(0x1000, 0x2000);
    img.write_u64(0x2000, 0x1000);

    let link = self_pointer();
    let graph = analyze(
        &Visitor::new(),
        vec![
            ("a".to_string(), img.value(0x1000, Arc::clone(&link))),
            ("b".to_string(), img.value(0x2000, link)),
        ],
    );

    // b's slot was first discovered through a's dereference
    assert_eq!(graph.region_name(0x1000, 8), Some("a"));
    assert_eq!(graph.region_name(0x2000, 8), Some("*a"));
}

#[test]
fn test_struct_members_become_nested_regions()
{
    let ty = TypeDescriptor::structure(
        "Pair",
        8,
        vec![
            Member::field("x", cxx::int_(), 0),
            Member::field("y", cxx::int_(), 4),
        ],
    );
    let mut img = Image::new(0x3000, 0x40);
    img.write_i32(0x3000, 1);
    img.write_i32(0x3004, 2);

    let graph = analyze(&Visitor::new(), vec![("p".to_string(), img.value(0x3000, ty))]);

    // the struct plus both scalar members
    assert_eq!(graph.region_count(), 3);
    // plain composition produces no points-to edges
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.region_name(0x3000, 8), Some("p"));
    assert_eq!(graph.region_name(0x3000, 4), Some("x"));
    assert_eq!(graph.region_name(0x3004, 4), Some("y"));
}

#[test]
fn test_container_elements_get_edges()
{
    let mut img = Image::new(0x10000, 0x1000);
    let at = img.alloc(24, 8);
    cxx::write_int_vector(&mut img, at, &[1, 2], 2);

    let graph = analyze(
        &Visitor::new(),
        vec![("v".to_string(), img.value(at, cxx::vector_of(&cxx::int_(), "int")))],
    );

    // vector region + two element regions
    assert_eq!(graph.region_count(), 3);
    // both elements hang off the container by position
    assert_eq!(graph.edge_count(), 2);
    let elems: Vec<_> = graph.regions().filter(|(_, _, name)| name.starts_with('[')).collect();
    assert_eq!(elems.len(), 2);
    for (addr, _, _) in elems {
        assert!(graph.has_edge(at, addr));
    }
}

#[test]
fn test_struct_cycle_bounded_regions_and_edges()
{
    let cyc = TypeDescriptor::new(TypeCategory::Struct, Some("Cyc".to_string()), 16);
    let ptr = TypeDescriptor::pointer(Arc::clone(&cyc));
    cyc.set_members(vec![
        Member::field("pad", cxx::int_(), 0),
        Member::field("next", ptr, 8),
    ]);

    let mut img = Image::new(0x4000, 0x100);
    img.write_i32(0x4000, 1);
    img.write_u64(0x4008, 0x4040);
    img.write_i32(0x4040, 2);
    img.write_u64(0x4048, 0x4000);

    let graph = analyze(
        &Visitor::new(),
        vec![
            ("a".to_string(), img.value(0x4000, Arc::clone(&cyc))),
            ("b".to_string(), img.value(0x4040, cyc)),
        ],
    );

    // finite: 2 structs, 2 pads, 2 pointer slots
    assert_eq!(graph.region_count(), 6);
    // one points-to edge per pointer slot, despite the cycle
    assert_eq!(graph.edge_count(), 2);
    assert!(graph.has_edge(0x4008, 0x4040));
    assert!(graph.has_edge(0x4048, 0x4000));
}

#[test]
fn test_report_orders_outer_regions_first()
{
    let ty = TypeDescriptor::structure(
        "Pair",
        8,
        vec![
            Member::field("x", cxx::int_(), 0),
            Member::field("y", cxx::int_(), 4),
        ],
    );
    let mut img = Image::new(0x3000, 0x40);
    img.write_i32(0x3000, 7);
    img.write_i32(0x3004, 8);

    let graph = analyze(&Visitor::new(), vec![("p".to_string(), img.value(0x3000, ty))]);
    let mut out = Vec::new();
    graph.report(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.lines().collect();

    assert_eq!(lines[0], "3 regions, 0 edges");
    // enclosing struct first; x nests under it, y starts past x's span so
    // the run-length indent resets (indentation is cosmetic, not exact)
    assert!(lines[1].ends_with(" p"));
    assert!(lines[2].ends_with("    x"));
    assert!(lines[3].ends_with(" y"));
}
