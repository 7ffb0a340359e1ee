//! # DWARF Type Provider
//!
//! Builds [`TypeDescriptor`] graphs and a global-variable list from a
//! binary's DWARF, giving the core a concrete source of static type
//! structure. Only `.debug_info` is consumed: no line tables, no unwind
//! data.
//!
//! Descriptor construction is cycle-aware: a shell descriptor is registered
//! in the per-load cache *before* its target/members are built, so
//! self-referential types (a struct pointing at itself) complete into the
//! same shared graph the debuggee has.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use gimli::{
    constants, AttributeValue, Dwarf, EndianArcSlice, Reader, RunTimeEndian, SectionId, Unit, UnitOffset,
    UnitSectionOffset,
};
use object::{Object, ObjectSection};
use tracing::debug;

use crate::error::{Result, SpelunkError};
use crate::value::{Member, MemberKind, TypeCategory, TypeDescriptor, TypeRef};

type OwnedReader = EndianArcSlice<RunTimeEndian>;
type OwnedDwarf = Dwarf<OwnedReader>;

/// A named debuggee location with a static type.
#[derive(Debug, Clone)]
pub struct GlobalVariable
{
    pub name: String,
    /// Link-time address; add the load bias for PIE executables
    pub address: u64,
    pub ty: TypeRef,
}

/// Parsed debug information for one binary.
pub struct DebugInfo
{
    dwarf: OwnedDwarf,
    units: Vec<Unit<OwnedReader>>,
    position_independent: bool,
}

impl DebugInfo
{
    /// Read and parse `path`, loading every DWARF section it has.
    pub fn load(path: &Path) -> Result<Self>
    {
        let bytes = fs::read(path)?;
        let data = Arc::<[u8]>::from(bytes);
        let file = object::File::parse(&*data)
            .map_err(|err| SpelunkError::Dwarf(format!("failed to parse {}: {err}", path.display())))?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };
        let position_independent = matches!(file.kind(), object::ObjectKind::Dynamic);

        let mut sections: HashMap<&'static str, Arc<[u8]>> = HashMap::new();
        for (canonical, aliases) in DWARF_SECTIONS {
            sections.insert(*canonical, load_section_bytes(&file, aliases)?);
        }

        let dwarf = Dwarf::load(|section| Ok::<_, gimli::Error>(section_reader(&sections, endian, section)))
            .map_err(|err| SpelunkError::Dwarf(format!("failed to load DWARF: {err}")))?;

        let mut units = Vec::new();
        let mut headers = dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
        {
            units.push(
                dwarf
                    .unit(header)
                    .map_err(|err| map_dwarf_error("parsing compilation unit", err))?,
            );
        }

        Ok(DebugInfo {
            dwarf,
            units,
            position_independent,
        })
    }

    /// Does this binary relocate at load time (PIE)?
    pub fn is_position_independent(&self) -> bool
    {
        self.position_independent
    }

    /// Every variable with a static address: globals plus function-local
    /// statics. Addresses are link-time; PIE callers add their load bias.
    pub fn global_variables(&self) -> Result<Vec<GlobalVariable>>
    {
        let builder = TypeBuilder::new(&self.dwarf, &self.units);
        let mut globals = Vec::new();

        for unit in &self.units {
            let mut scope = ScopeStack::default();
            let mut cursor = unit.entries();
            while let Some((delta, entry)) = cursor
                .next_dfs()
                .map_err(|err| map_dwarf_error("traversing DIE tree", err))?
            {
                scope.step(delta);

                if entry.tag() == constants::DW_TAG_variable {
                    if let Some(global) = self.build_variable(&builder, unit, entry, &scope)? {
                        globals.push(global);
                    }
                }

                scope.open(component_name(&self.dwarf, unit, entry)?);
            }
        }

        Ok(globals)
    }

    fn build_variable(
        &self,
        builder: &TypeBuilder<'_>,
        unit: &Unit<OwnedReader>,
        entry: &gimli::DebuggingInformationEntry<'_, '_, OwnedReader>,
        scope: &ScopeStack,
    ) -> Result<Option<GlobalVariable>>
    {
        if attr_flag(entry, constants::DW_AT_declaration)? {
            return Ok(None);
        }
        let Some(address) = static_address(entry)? else {
            return Ok(None);
        };
        let Some(name) = entry_name(&self.dwarf, unit, entry)? else {
            return Ok(None);
        };
        let Some(type_attr) = entry
            .attr(constants::DW_AT_type)
            .map_err(|err| map_dwarf_error("reading DW_AT_type", err))?
        else {
            return Ok(None);
        };
        let ty = match builder.build_from_attr(unit, type_attr.value()) {
            Ok(ty) => ty,
            Err(err) => {
                debug!(name = %name, %err, "skipping variable with unreadable type");
                return Ok(None);
            }
        };

        Ok(Some(GlobalVariable {
            name: scope.qualify(&name),
            address,
            ty,
        }))
    }

    /// Build the descriptor for a named struct/class/union/enum, for
    /// callers that cast raw memory to a type they know by name.
    pub fn type_by_name(&self, target: &str) -> Result<Option<TypeRef>>
    {
        let builder = TypeBuilder::new(&self.dwarf, &self.units);
        for unit in &self.units {
            let mut scope = ScopeStack::default();
            let mut cursor = unit.entries();
            while let Some((delta, entry)) = cursor
                .next_dfs()
                .map_err(|err| map_dwarf_error("traversing DIE tree", err))?
            {
                scope.step(delta);
                let named = matches!(
                    entry.tag(),
                    constants::DW_TAG_structure_type
                        | constants::DW_TAG_class_type
                        | constants::DW_TAG_union_type
                        | constants::DW_TAG_enumeration_type
                );
                if named {
                    if let Some(name) = entry_name(&self.dwarf, unit, entry)? {
                        if scope.qualify(&name) == target || name == target {
                            return builder.build(unit, entry.offset()).map(Some);
                        }
                    }
                }
                scope.open(component_name(&self.dwarf, unit, entry)?);
            }
        }
        Ok(None)
    }
}

/// Namespace/class nesting during a DFS walk, for qualified names.
#[derive(Default)]
struct ScopeStack
{
    components: Vec<Option<String>>,
}

impl ScopeStack
{
    /// Apply the cursor's depth delta before inspecting the new entry.
    fn step(&mut self, delta: isize)
    {
        if delta <= 0 {
            // moved to a sibling (0) or back up (-n): one extra pop for the
            // sibling position itself
            let pops = (1 - delta) as usize;
            for _ in 0..pops.min(self.components.len()) {
                self.components.pop();
            }
        }
    }

    /// Record the current entry as an (optional) scope component for its
    /// children.
    fn open(&mut self, component: Option<String>)
    {
        self.components.push(component);
    }

    fn qualify(&self, name: &str) -> String
    {
        let mut qualified = String::new();
        for component in self.components.iter().flatten() {
            qualified.push_str(component);
            qualified.push_str("::");
        }
        qualified.push_str(name);
        qualified
    }
}

/// Scope component contributed by an entry, if it opens a named scope.
fn component_name(
    dwarf: &OwnedDwarf,
    unit: &Unit<OwnedReader>,
    entry: &gimli::DebuggingInformationEntry<'_, '_, OwnedReader>,
) -> Result<Option<String>>
{
    let opens_scope = matches!(
        entry.tag(),
        constants::DW_TAG_namespace | constants::DW_TAG_structure_type | constants::DW_TAG_class_type
    );
    if opens_scope {
        entry_name(dwarf, unit, entry)
    } else {
        Ok(None)
    }
}

struct TypeBuilder<'a>
{
    dwarf: &'a OwnedDwarf,
    units: &'a [Unit<OwnedReader>],
    cache: RefCell<HashMap<UnitSectionOffset<usize>, TypeRef>>,
    /// Qualified names per DIE, filled by one scope walk per unit
    qualified: RefCell<HashMap<UnitSectionOffset<usize>, String>>,
    scanned: RefCell<HashSet<UnitSectionOffset<usize>>>,
}

impl<'a> TypeBuilder<'a>
{
    fn new(dwarf: &'a OwnedDwarf, units: &'a [Unit<OwnedReader>]) -> Self
    {
        TypeBuilder {
            dwarf,
            units,
            cache: RefCell::new(HashMap::new()),
            qualified: RefCell::new(HashMap::new()),
            scanned: RefCell::new(HashSet::new()),
        }
    }

    fn build_from_attr(&self, unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> Result<TypeRef>
    {
        match value {
            AttributeValue::UnitRef(offset) => self.build(unit, offset),
            AttributeValue::DebugInfoRef(offset) => {
                let target = UnitSectionOffset::from(offset);
                let (target_unit, unit_offset) = self
                    .units
                    .iter()
                    .find_map(|u| target.to_unit_offset(u).map(|o| (u, o)))
                    .ok_or_else(|| SpelunkError::Dwarf("dangling cross-unit type reference".to_string()))?;
                self.build(target_unit, unit_offset)
            }
            _ => Err(SpelunkError::Dwarf("unsupported type reference form".to_string())),
        }
    }

    fn build(&self, unit: &Unit<OwnedReader>, offset: UnitOffset<usize>) -> Result<TypeRef>
    {
        let key = offset.to_unit_section_offset(unit);
        if let Some(existing) = self.cache.borrow().get(&key) {
            return Ok(Arc::clone(existing));
        }

        let entry = unit
            .entry(offset)
            .map_err(|err| map_dwarf_error("resolving type DIE", err))?;
        let name = entry_name(self.dwarf, unit, &entry)?;
        let size = attr_udata(&entry, constants::DW_AT_byte_size)?.unwrap_or(0);

        match entry.tag() {
            constants::DW_TAG_base_type => {
                let ty = self.base_type(&entry, name, size)?;
                self.cache.borrow_mut().insert(key, Arc::clone(&ty));
                Ok(ty)
            }
            constants::DW_TAG_pointer_type => {
                let ty = TypeDescriptor::new(TypeCategory::Pointer, name, if size == 0 { 8 } else { size });
                self.cache.borrow_mut().insert(key, Arc::clone(&ty));
                ty.set_target(self.target_or_void(unit, &entry)?);
                Ok(ty)
            }
            constants::DW_TAG_reference_type | constants::DW_TAG_rvalue_reference_type => {
                let ty = TypeDescriptor::new(TypeCategory::Reference, name, if size == 0 { 8 } else { size });
                self.cache.borrow_mut().insert(key, Arc::clone(&ty));
                ty.set_target(self.target_or_void(unit, &entry)?);
                Ok(ty)
            }
            constants::DW_TAG_typedef => {
                let ty = TypeDescriptor::new(TypeCategory::Typedef, name, size);
                self.cache.borrow_mut().insert(key, Arc::clone(&ty));
                ty.set_target(self.target_or_void(unit, &entry)?);
                Ok(ty)
            }
            constants::DW_TAG_const_type => {
                let inner = self.target_or_void(unit, &entry)?;
                let ty = inner.with_const();
                self.cache.borrow_mut().insert(key, Arc::clone(&ty));
                Ok(ty)
            }
            constants::DW_TAG_volatile_type | constants::DW_TAG_restrict_type => {
                let inner = self.target_or_void(unit, &entry)?;
                self.cache.borrow_mut().insert(key, Arc::clone(&inner));
                Ok(inner)
            }
            constants::DW_TAG_array_type => {
                let elem = self.target_or_void(unit, &entry)?;
                let count = self.array_count(unit, offset)?;
                let ty = TypeDescriptor::array(elem, count);
                self.cache.borrow_mut().insert(key, Arc::clone(&ty));
                Ok(ty)
            }
            constants::DW_TAG_structure_type | constants::DW_TAG_class_type => {
                let ty = TypeDescriptor::new(TypeCategory::Struct, self.qualified_name(unit, offset, name)?, size);
                self.cache.borrow_mut().insert(key, Arc::clone(&ty));
                let (members, args) = self.collect_members(unit, offset)?;
                ty.set_members(members);
                ty.set_template_args(args);
                Ok(ty)
            }
            constants::DW_TAG_union_type => {
                let ty = TypeDescriptor::new(TypeCategory::Union, self.qualified_name(unit, offset, name)?, size);
                self.cache.borrow_mut().insert(key, Arc::clone(&ty));
                let (members, args) = self.collect_members(unit, offset)?;
                ty.set_members(members);
                ty.set_template_args(args);
                Ok(ty)
            }
            constants::DW_TAG_enumeration_type => {
                let mut underlying = size;
                if underlying == 0 {
                    underlying = 4;
                }
                let ty = TypeDescriptor::enumeration(
                    self.qualified_name(unit, offset, name)?.as_deref().unwrap_or("<enum>"),
                    underlying,
                );
                self.cache.borrow_mut().insert(key, Arc::clone(&ty));
                Ok(ty)
            }
            constants::DW_TAG_subroutine_type => {
                let ty = TypeDescriptor::new(TypeCategory::Function, name, size);
                self.cache.borrow_mut().insert(key, Arc::clone(&ty));
                Ok(ty)
            }
            constants::DW_TAG_ptr_to_member_type => {
                let ty = TypeDescriptor::new(TypeCategory::MethodPtr, name, if size == 0 { 16 } else { size });
                self.cache.borrow_mut().insert(key, Arc::clone(&ty));
                Ok(ty)
            }
            other => {
                debug!(tag = ?other, "unrecognized type DIE");
                let ty = TypeDescriptor::new(TypeCategory::Other, name, size);
                self.cache.borrow_mut().insert(key, Arc::clone(&ty));
                Ok(ty)
            }
        }
    }

    fn base_type(
        &self,
        entry: &gimli::DebuggingInformationEntry<'_, '_, OwnedReader>,
        name: Option<String>,
        size: u64,
    ) -> Result<TypeRef>
    {
        let encoding = entry
            .attr(constants::DW_AT_encoding)
            .map_err(|err| map_dwarf_error("reading DW_AT_encoding", err))?
            .and_then(|attr| match attr.value() {
                AttributeValue::Encoding(encoding) => Some(encoding),
                _ => None,
            });

        let label = name.as_deref().unwrap_or("?");
        let ty = match encoding {
            Some(constants::DW_ATE_boolean) => TypeDescriptor::new(TypeCategory::Bool, name.clone(), size),
            Some(constants::DW_ATE_float) => TypeDescriptor::float(label, size),
            Some(constants::DW_ATE_signed_char) | Some(constants::DW_ATE_unsigned_char) => {
                TypeDescriptor::new(TypeCategory::Char, name.clone(), size)
            }
            Some(constants::DW_ATE_signed) => TypeDescriptor::int(label, size),
            Some(constants::DW_ATE_unsigned) => TypeDescriptor::uint(label, size),
            _ => TypeDescriptor::new(TypeCategory::Other, name.clone(), size),
        };
        Ok(ty)
    }

    fn target_or_void(
        &self,
        unit: &Unit<OwnedReader>,
        entry: &gimli::DebuggingInformationEntry<'_, '_, OwnedReader>,
    ) -> Result<TypeRef>
    {
        match entry
            .attr(constants::DW_AT_type)
            .map_err(|err| map_dwarf_error("reading DW_AT_type", err))?
        {
            Some(attr) => self.build_from_attr(unit, attr.value()),
            None => Ok(TypeDescriptor::new(TypeCategory::Void, Some("void".to_string()), 0)),
        }
    }

    fn array_count(&self, unit: &Unit<OwnedReader>, offset: UnitOffset<usize>) -> Result<u64>
    {
        let mut tree = unit
            .entries_tree(Some(offset))
            .map_err(|err| map_dwarf_error("building array tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating array root", err))?;
        let mut children = root.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating array children", err))?
        {
            let entry = child.entry();
            if entry.tag() != constants::DW_TAG_subrange_type {
                continue;
            }
            if let Some(count) = attr_udata(entry, constants::DW_AT_count)? {
                return Ok(count);
            }
            if let Some(upper) = attr_udata(entry, constants::DW_AT_upper_bound)? {
                return Ok(upper + 1);
            }
        }
        Ok(0)
    }

    fn collect_members(&self, unit: &Unit<OwnedReader>, offset: UnitOffset<usize>) -> Result<(Vec<Member>, Vec<TypeRef>)>
    {
        let mut members = Vec::new();
        let mut template_args = Vec::new();

        let mut tree = unit
            .entries_tree(Some(offset))
            .map_err(|err| map_dwarf_error("building struct tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating struct root", err))?;
        let mut children = root.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating struct children", err))?
        {
            let entry = child.entry();
            match entry.tag() {
                constants::DW_TAG_member => {
                    let is_static = static_address(entry)?.is_some()
                        || (attr_flag(entry, constants::DW_AT_external)? && attr_flag(entry, constants::DW_AT_declaration)?);
                    let ty = match entry
                        .attr(constants::DW_AT_type)
                        .map_err(|err| map_dwarf_error("reading member type", err))?
                    {
                        Some(attr) => self.build_from_attr(unit, attr.value())?,
                        None => continue,
                    };
                    members.push(Member {
                        name: entry_name(self.dwarf, unit, entry)?,
                        ty,
                        offset_bits: member_offset_bits(entry)?.unwrap_or(0),
                        kind: if is_static { MemberKind::Static } else { MemberKind::Field },
                        artificial: attr_flag(entry, constants::DW_AT_artificial)?,
                    });
                }
                constants::DW_TAG_inheritance => {
                    let ty = match entry
                        .attr(constants::DW_AT_type)
                        .map_err(|err| map_dwarf_error("reading base type", err))?
                    {
                        Some(attr) => self.build_from_attr(unit, attr.value())?,
                        None => continue,
                    };
                    members.push(Member {
                        name: None,
                        ty,
                        offset_bits: member_offset_bits(entry)?.unwrap_or(0),
                        kind: MemberKind::BaseClass,
                        artificial: false,
                    });
                }
                constants::DW_TAG_template_type_parameter => {
                    if let Some(attr) = entry
                        .attr(constants::DW_AT_type)
                        .map_err(|err| map_dwarf_error("reading template parameter", err))?
                    {
                        if let Ok(arg) = self.build_from_attr(unit, attr.value()) {
                            template_args.push(arg);
                        }
                    }
                }
                _ => {}
            }
        }

        Ok((members, template_args))
    }

    /// Record the qualified name of every named aggregate in `unit`, once.
    fn ensure_scanned(&self, unit: &Unit<OwnedReader>) -> Result<()>
    {
        let unit_key = unit.header.offset();
        if !self.scanned.borrow_mut().insert(unit_key) {
            return Ok(());
        }
        let mut scope = ScopeStack::default();
        let mut cursor = unit.entries();
        while let Some((delta, entry)) = cursor
            .next_dfs()
            .map_err(|err| map_dwarf_error("traversing DIE tree", err))?
        {
            scope.step(delta);
            let named = matches!(
                entry.tag(),
                constants::DW_TAG_structure_type
                    | constants::DW_TAG_class_type
                    | constants::DW_TAG_union_type
                    | constants::DW_TAG_enumeration_type
            );
            if named {
                if let Some(name) = entry_name(self.dwarf, unit, entry)? {
                    self.qualified
                        .borrow_mut()
                        .insert(entry.offset().to_unit_section_offset(unit), scope.qualify(&name));
                }
            }
            scope.open(component_name(self.dwarf, unit, entry)?);
        }
        Ok(())
    }

    /// Namespaced name for an aggregate DIE, falling back to the raw name.
    fn qualified_name(
        &self,
        unit: &Unit<OwnedReader>,
        offset: UnitOffset<usize>,
        raw: Option<String>,
    ) -> Result<Option<String>>
    {
        self.ensure_scanned(unit)?;
        let key = offset.to_unit_section_offset(unit);
        Ok(self.qualified.borrow().get(&key).cloned().or(raw))
    }
}

const DWARF_SECTIONS: &[(&str, &[&str])] = &[
    (".debug_abbrev", &[".debug_abbrev", "__debug_abbrev"]),
    (".debug_addr", &[".debug_addr", "__debug_addr"]),
    (".debug_info", &[".debug_info", "__debug_info"]),
    (".debug_line", &[".debug_line", "__debug_line"]),
    (".debug_line_str", &[".debug_line_str", "__debug_line_str"]),
    (".debug_ranges", &[".debug_ranges", "__debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists", "__debug_rnglists"]),
    (".debug_str", &[".debug_str", "__debug_str"]),
    (".debug_str_offsets", &[".debug_str_offsets", "__debug_str_offsets"]),
    (".debug_types", &[".debug_types", "__debug_types"]),
    (".debug_loc", &[".debug_loc", "__debug_loc"]),
    (".debug_loclists", &[".debug_loclists", "__debug_loclists"]),
];

fn section_reader(sections: &HashMap<&'static str, Arc<[u8]>>, endian: RunTimeEndian, id: SectionId) -> OwnedReader
{
    let data = sections
        .get(id.name())
        .cloned()
        .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
    EndianArcSlice::new(data, endian)
}

fn load_section_bytes<'data>(file: &object::File<'data>, names: &[&str]) -> Result<Arc<[u8]>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section
                .uncompressed_data()
                .map_err(|err| SpelunkError::Dwarf(format!("failed to read {name}: {err}")))?;
            return Ok(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes.to_vec()),
                Cow::Owned(vec) => vec.into(),
            });
        }
    }
    Ok(Arc::<[u8]>::from(Vec::new()))
}

fn entry_name(
    dwarf: &OwnedDwarf,
    unit: &Unit<OwnedReader>,
    entry: &gimli::DebuggingInformationEntry<'_, '_, OwnedReader>,
) -> Result<Option<String>>
{
    if let Some(attr) = entry
        .attr(constants::DW_AT_name)
        .map_err(|err| map_dwarf_error("reading DW_AT_name", err))?
    {
        return Ok(Some(attr_to_string(dwarf, unit, attr.value())?));
    }
    if let Some(attr) = entry
        .attr(constants::DW_AT_linkage_name)
        .map_err(|err| map_dwarf_error("reading DW_AT_linkage_name", err))?
    {
        let raw = attr_to_string(dwarf, unit, attr.value())?;
        let demangled = rustc_demangle::try_demangle(&raw).map(|d| d.to_string()).ok();
        return Ok(Some(demangled.unwrap_or(raw)));
    }
    Ok(None)
}

fn attr_to_string(dwarf: &OwnedDwarf, unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> Result<String>
{
    let reader = dwarf
        .attr_string(unit, value)
        .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
    let owned = match reader.to_string() {
        Ok(cow) => cow.into_owned(),
        Err(_) => reader
            .to_string_lossy()
            .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
            .into_owned(),
    };
    Ok(owned)
}

fn attr_udata(
    entry: &gimli::DebuggingInformationEntry<'_, '_, OwnedReader>,
    attr: constants::DwAt,
) -> Result<Option<u64>>
{
    Ok(entry
        .attr(attr)
        .map_err(|err| map_dwarf_error("reading attribute", err))?
        .and_then(|a| a.udata_value()))
}

fn attr_flag(
    entry: &gimli::DebuggingInformationEntry<'_, '_, OwnedReader>,
    attr: constants::DwAt,
) -> Result<bool>
{
    Ok(entry
        .attr(attr)
        .map_err(|err| map_dwarf_error("reading flag attribute", err))?
        .map(|a| matches!(a.value(), AttributeValue::Flag(true)))
        .unwrap_or(false))
}

/// Byte or bit offset of a member within its enclosing aggregate, in bits.
fn member_offset_bits(entry: &gimli::DebuggingInformationEntry<'_, '_, OwnedReader>) -> Result<Option<u64>>
{
    if let Some(bits) = attr_udata(entry, constants::DW_AT_data_bit_offset)? {
        return Ok(Some(bits));
    }
    if let Some(bytes) = attr_udata(entry, constants::DW_AT_data_member_location)? {
        return Ok(Some(bytes * 8));
    }
    Ok(None)
}

/// Extract a static address from a `DW_OP_addr` location expression.
fn static_address(entry: &gimli::DebuggingInformationEntry<'_, '_, OwnedReader>) -> Result<Option<u64>>
{
    let Some(attr) = entry
        .attr(constants::DW_AT_location)
        .map_err(|err| map_dwarf_error("reading DW_AT_location", err))?
    else {
        return Ok(None);
    };
    let AttributeValue::Exprloc(expression) = attr.value() else {
        return Ok(None);
    };
    let bytes = expression
        .0
        .to_slice()
        .map_err(|err| map_dwarf_error("reading location expression", err))?;
    // DW_OP_addr (0x03) followed by one machine address
    if bytes.len() == 9 && bytes[0] == constants::DW_OP_addr.0 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[1..]);
        return Ok(Some(u64::from_le_bytes(raw)));
    }
    Ok(None)
}

fn map_dwarf_error(context: &str, err: gimli::Error) -> SpelunkError
{
    SpelunkError::Dwarf(format!("{context}: {err}"))
}
