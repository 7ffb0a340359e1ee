//! libstdc++-shaped type descriptors and instance builders.
//!
//! Layouts follow the GNU library ABI the decoders expect: the member
//! names, offsets and node shapes here are the ones a real debuggee built
//! with libstdc++ exposes through its debug info.

use spelunk_core::value::{Member, TypeDescriptor, TypeRef};

use super::Image;

pub fn int_() -> TypeRef
{
    TypeDescriptor::int("int", 4)
}

pub fn uint_() -> TypeRef
{
    TypeDescriptor::uint("unsigned int", 4)
}

pub fn long_() -> TypeRef
{
    TypeDescriptor::int("long", 8)
}

pub fn ulong_() -> TypeRef
{
    TypeDescriptor::uint("unsigned long", 8)
}

pub fn double_() -> TypeRef
{
    TypeDescriptor::float("double", 8)
}

pub fn float_() -> TypeRef
{
    TypeDescriptor::float("float", 4)
}

pub fn bool_() -> TypeRef
{
    TypeDescriptor::boolean()
}

pub fn char_() -> TypeRef
{
    TypeDescriptor::character()
}

/// `const char*`, the C-string special case.
pub fn cstring_ptr() -> TypeRef
{
    TypeDescriptor::pointer(TypeDescriptor::const_character())
}

pub fn void_ptr() -> TypeRef
{
    TypeDescriptor::pointer(TypeDescriptor::new(
        spelunk_core::value::TypeCategory::Void,
        Some("void".to_string()),
        0,
    ))
}

fn ptr(target: &TypeRef) -> TypeRef
{
    TypeDescriptor::pointer(target.clone())
}

// ---------------------------------------------------------------------------
// std::vector

pub fn vector_of(elem: &TypeRef, elem_name: &str) -> TypeRef
{
    let impl_ = TypeDescriptor::structure(
        "std::_Vector_base<T, std::allocator<T> >::_Vector_impl",
        24,
        vec![
            Member::field("_M_start", ptr(elem), 0),
            Member::field("_M_finish", ptr(elem), 8),
            Member::field("_M_end_of_storage", ptr(elem), 16),
        ],
    );
    let name = format!("std::vector<{elem_name}, std::allocator<{elem_name}> >");
    let vec = TypeDescriptor::structure(&name, 24, vec![Member::field("_M_impl", impl_, 0)]);
    vec.set_template_args(vec![elem.clone()]);
    vec
}

/// Write a `vector<int>` object at `at`; element storage is allocated in
/// the image.
pub fn write_int_vector(img: &mut Image, at: u64, values: &[i32], capacity: u64)
{
    assert!(capacity >= values.len() as u64);
    let start = img.alloc(capacity * 4, 4);
    for (i, v) in values.iter().enumerate() {
        img.write_i32(start + i as u64 * 4, *v);
    }
    img.write_u64(at, start);
    img.write_u64(at + 8, start + values.len() as u64 * 4);
    img.write_u64(at + 16, start + capacity * 4);
}

// ---------------------------------------------------------------------------
// std::pair

pub fn pair_int_int(name: &str) -> TypeRef
{
    TypeDescriptor::structure(
        name,
        8,
        vec![
            Member::field("first", int_(), 0),
            Member::field("second", int_(), 4),
        ],
    )
}

// ---------------------------------------------------------------------------
// std::unordered_map / std::unordered_set

fn hashtable(payload: TypeRef, key: TypeRef) -> TypeRef
{
    let node_base = TypeDescriptor::structure(
        "std::__detail::_Hash_node_base",
        8,
        vec![Member::field("_M_nxt", void_ptr(), 0)],
    );
    let table = TypeDescriptor::structure(
        "std::_Hashtable",
        56,
        vec![
            Member::field("_M_buckets", void_ptr(), 0),
            Member::field("_M_bucket_count", ulong_(), 8),
            Member::field("_M_before_begin", node_base, 16),
            Member::field("_M_element_count", ulong_(), 24),
        ],
    );
    table.set_template_args(vec![key, payload]);
    table
}

pub fn unordered_map_int_int() -> TypeRef
{
    let payload = pair_int_int("std::pair<int const, int>");
    let name = "std::unordered_map<int, int, std::hash<int>, std::equal_to<int>, \
                std::allocator<std::pair<int const, int> > >";
    let map = TypeDescriptor::structure(name, 56, vec![Member::field("_M_h", hashtable(payload, int_()), 0)]);
    map.set_template_args(vec![int_(), int_()]);
    map
}

pub fn unordered_set_int() -> TypeRef
{
    let name = "std::unordered_set<int, std::hash<int>, std::equal_to<int>, std::allocator<int> >";
    let set = TypeDescriptor::structure(name, 56, vec![Member::field("_M_h", hashtable(int_(), int_()), 0)]);
    set.set_template_args(vec![int_()]);
    set
}

/// Write an `unordered_map<int, int>` whose chain yields `pairs` in order.
pub fn write_unordered_map_int_int(img: &mut Image, at: u64, pairs: &[(i32, i32)], bucket_count: u64)
{
    // node: _M_nxt (8) then pair payload (8)
    let mut nodes = Vec::new();
    for _ in pairs {
        nodes.push(img.alloc(16, 8));
    }
    for (i, &(k, v)) in pairs.iter().enumerate() {
        let node = nodes[i];
        let next = nodes.get(i + 1).copied().unwrap_or(0);
        img.write_u64(node, next);
        img.write_i32(node + 8, k);
        img.write_i32(node + 12, v);
    }
    let head = nodes.first().copied().unwrap_or(0);
    img.write_u64(at + 8, bucket_count);
    img.write_u64(at + 16, head);
    img.write_u64(at + 24, pairs.len() as u64);
}

// ---------------------------------------------------------------------------
// std::map

fn rb_node_base() -> TypeRef
{
    TypeDescriptor::structure(
        "std::_Rb_tree_node_base",
        32,
        vec![
            Member::field("_M_color", TypeDescriptor::enumeration("std::_Rb_tree_color", 4), 0),
            Member::field("_M_parent", void_ptr(), 8),
            Member::field("_M_left", void_ptr(), 16),
            Member::field("_M_right", void_ptr(), 24),
        ],
    )
}

pub fn map_int_int() -> TypeRef
{
    let payload = pair_int_int("std::pair<int const, int>");
    let impl_ = TypeDescriptor::structure(
        "std::_Rb_tree<...>::_Rb_tree_impl",
        48,
        vec![
            Member::field("_M_header", rb_node_base(), 8),
            Member::field("_M_node_count", ulong_(), 40),
        ],
    );
    let tree = TypeDescriptor::structure("std::_Rb_tree", 48, vec![Member::field("_M_impl", impl_, 0)]);
    tree.set_template_args(vec![int_(), payload]);

    let name = "std::map<int, int, std::less<int>, std::allocator<std::pair<int const, int> > >";
    let map = TypeDescriptor::structure(name, 48, vec![Member::field("_M_t", tree, 0)]);
    map.set_template_args(vec![int_(), int_()]);
    map
}

/// Write a `map<int, int>` as a right-spine tree: in-order succession
/// visits `pairs` exactly in the given order.
pub fn write_map_int_int(img: &mut Image, at: u64, pairs: &[(i32, i32)])
{
    // node: 32-byte base then the pair payload
    let mut nodes = Vec::new();
    for _ in pairs {
        nodes.push(img.alloc(40, 8));
    }
    for (i, &(k, v)) in pairs.iter().enumerate() {
        let node = nodes[i];
        let parent = if i == 0 { at + 8 } else { nodes[i - 1] };
        let right = nodes.get(i + 1).copied().unwrap_or(0);
        img.write_u64(node + 8, parent);
        img.write_u64(node + 16, 0); // no left child
        img.write_u64(node + 24, right);
        img.write_i32(node + 32, k);
        img.write_i32(node + 36, v);
    }
    // header at `at + 8`: leftmost node in _M_left
    img.write_u64(at + 8 + 16, nodes.first().copied().unwrap_or(0));
    img.write_u64(at + 40, pairs.len() as u64);
}

// ---------------------------------------------------------------------------
// std::list

pub fn list_int() -> TypeRef
{
    let header = TypeDescriptor::structure(
        "std::__detail::_List_node_header",
        24,
        vec![
            Member::field("_M_next", void_ptr(), 0),
            Member::field("_M_prev", void_ptr(), 8),
            Member::field("_M_size", ulong_(), 16),
        ],
    );
    let impl_ = TypeDescriptor::structure(
        "std::__cxx11::_List_base<int, std::allocator<int> >::_List_impl",
        24,
        vec![Member::field("_M_node", header, 0)],
    );
    let list = TypeDescriptor::structure(
        "std::__cxx11::list<int, std::allocator<int> >",
        24,
        vec![Member::field("_M_impl", impl_, 0)],
    );
    list.set_template_args(vec![int_()]);
    list
}

/// Write a `list<int>`: sentinel at `at`, one 24-byte node per element.
pub fn write_list_int(img: &mut Image, at: u64, values: &[i32])
{
    let mut nodes = Vec::new();
    for _ in values {
        nodes.push(img.alloc(24, 8));
    }
    let sentinel = at;
    for (i, &v) in values.iter().enumerate() {
        let node = nodes[i];
        let next = nodes.get(i + 1).copied().unwrap_or(sentinel);
        let prev = if i == 0 { sentinel } else { nodes[i - 1] };
        img.write_u64(node, next);
        img.write_u64(node + 8, prev);
        img.write_i32(node + 16, v);
    }
    img.write_u64(sentinel, nodes.first().copied().unwrap_or(sentinel));
    img.write_u64(sentinel + 8, nodes.last().copied().unwrap_or(sentinel));
    img.write_u64(sentinel + 16, values.len() as u64);
}

// ---------------------------------------------------------------------------
// std::deque

pub fn deque_int() -> TypeRef
{
    let iter = TypeDescriptor::structure(
        "std::_Deque_iterator<int, int&, int*>",
        32,
        vec![
            Member::field("_M_cur", ptr(&int_()), 0),
            Member::field("_M_first", ptr(&int_()), 8),
            Member::field("_M_last", ptr(&int_()), 16),
            Member::field("_M_node", void_ptr(), 24),
        ],
    );
    let impl_ = TypeDescriptor::structure(
        "std::_Deque_base<int, std::allocator<int> >::_Deque_impl",
        80,
        vec![
            Member::field("_M_map", void_ptr(), 0),
            Member::field("_M_map_size", ulong_(), 8),
            Member::field("_M_start", iter.clone(), 16),
            Member::field("_M_finish", iter, 48),
        ],
    );
    let deque = TypeDescriptor::structure(
        "std::deque<int, std::allocator<int> >",
        80,
        vec![Member::field("_M_impl", impl_, 0)],
    );
    deque.set_template_args(vec![int_()]);
    deque
}

const DEQUE_BLOCK_BYTES: u64 = 512;

/// Write a `deque<int>` spread over two blocks: `split` elements at the
/// tail of block 0, the rest at the head of block 1.
pub fn write_deque_int(img: &mut Image, at: u64, values: &[i32], split: usize)
{
    assert!(split > 0 && split < values.len());
    let map = img.alloc(16, 8);
    let block0 = img.alloc(DEQUE_BLOCK_BYTES, 8);
    let block1 = img.alloc(DEQUE_BLOCK_BYTES, 8);
    img.write_u64(map, block0);
    img.write_u64(map + 8, block1);

    let head = split as u64;
    let tail = (values.len() - split) as u64;
    let start_cur = block0 + DEQUE_BLOCK_BYTES - head * 4;
    for (i, &v) in values[..split].iter().enumerate() {
        img.write_i32(start_cur + i as u64 * 4, v);
    }
    for (i, &v) in values[split..].iter().enumerate() {
        img.write_i32(block1 + i as u64 * 4, v);
    }

    // _M_start
    img.write_u64(at + 16, start_cur);
    img.write_u64(at + 24, block0);
    img.write_u64(at + 32, block0 + DEQUE_BLOCK_BYTES);
    img.write_u64(at + 40, map);
    // _M_finish
    img.write_u64(at + 48, block1 + tail * 4);
    img.write_u64(at + 56, block1);
    img.write_u64(at + 64, block1 + DEQUE_BLOCK_BYTES);
    img.write_u64(at + 72, map + 8);
}

/// Write a `deque<int>` living in a single block (also the empty case).
pub fn write_deque_int_single(img: &mut Image, at: u64, values: &[i32])
{
    let map = img.alloc(8, 8);
    let block0 = img.alloc(DEQUE_BLOCK_BYTES, 8);
    img.write_u64(map, block0);
    for (i, &v) in values.iter().enumerate() {
        img.write_i32(block0 + i as u64 * 4, v);
    }
    img.write_u64(at + 16, block0);
    img.write_u64(at + 24, block0);
    img.write_u64(at + 32, block0 + DEQUE_BLOCK_BYTES);
    img.write_u64(at + 40, map);
    img.write_u64(at + 48, block0 + values.len() as u64 * 4);
    img.write_u64(at + 56, block0);
    img.write_u64(at + 64, block0 + DEQUE_BLOCK_BYTES);
    img.write_u64(at + 72, map);
}

// ---------------------------------------------------------------------------
// smart pointers

/// Modern nesting: `_M_t._M_t._M_head_impl`.
pub fn unique_ptr_int() -> TypeRef
{
    let tuple = TypeDescriptor::structure(
        "std::tuple<int*, std::default_delete<int> >",
        8,
        vec![Member::field("_M_head_impl", ptr(&int_()), 0)],
    );
    let data = TypeDescriptor::structure(
        "std::__uniq_ptr_data<int, std::default_delete<int> >",
        8,
        vec![Member::field("_M_t", tuple, 0)],
    );
    let unique = TypeDescriptor::structure(
        "std::unique_ptr<int, std::default_delete<int> >",
        8,
        vec![Member::field("_M_t", data, 0)],
    );
    unique.set_template_args(vec![int_()]);
    unique
}

/// Older nesting: `_M_t._M_head_impl` directly.
pub fn unique_ptr_int_legacy() -> TypeRef
{
    let tuple = TypeDescriptor::structure(
        "std::tuple<int*, std::default_delete<int> >",
        8,
        vec![Member::field("_M_head_impl", ptr(&int_()), 0)],
    );
    let unique = TypeDescriptor::structure(
        "std::unique_ptr<int, std::default_delete<int> >",
        8,
        vec![Member::field("_M_t", tuple, 0)],
    );
    unique.set_template_args(vec![int_()]);
    unique
}

pub fn shared_ptr_int() -> TypeRef
{
    let control = TypeDescriptor::structure(
        "std::_Sp_counted_base<(__gnu_cxx::_Lock_policy)2>",
        16,
        vec![
            Member {
                name: Some("_vptr".to_string()),
                ty: void_ptr(),
                offset_bits: 0,
                kind: spelunk_core::value::MemberKind::Field,
                artificial: true,
            },
            Member::field("_M_use_count", int_(), 8),
            Member::field("_M_weak_count", int_(), 12),
        ],
    );
    let refcount = TypeDescriptor::structure(
        "std::__shared_count<(__gnu_cxx::_Lock_policy)2>",
        8,
        vec![Member::field("_M_pi", ptr(&control), 0)],
    );
    let shared = TypeDescriptor::structure(
        "std::shared_ptr<int>",
        16,
        vec![
            Member::field("_M_ptr", ptr(&int_()), 0),
            Member::field("_M_refcount", refcount, 8),
        ],
    );
    shared.set_template_args(vec![int_()]);
    shared
}

/// Write a `shared_ptr<int>`; a control block is allocated when
/// `use_count > 0`.
pub fn write_shared_ptr(img: &mut Image, at: u64, target: u64, use_count: i32)
{
    img.write_u64(at, target);
    if use_count > 0 {
        let control = img.alloc(16, 8);
        img.write_i32(control + 8, use_count);
        img.write_i32(control + 12, 1);
        img.write_u64(at + 8, control);
    } else {
        img.write_u64(at + 8, 0);
    }
}

// ---------------------------------------------------------------------------
// std::string

pub fn string_() -> TypeRef
{
    let dataplus = TypeDescriptor::structure(
        "std::__cxx11::basic_string<char>::_Alloc_hider",
        8,
        vec![Member::field("_M_p", ptr(&char_()), 0)],
    );
    TypeDescriptor::structure(
        "std::__cxx11::basic_string<char, std::char_traits<char>, std::allocator<char> >",
        32,
        vec![
            Member::field("_M_dataplus", dataplus, 0),
            Member::field("_M_string_length", ulong_(), 8),
        ],
    )
}

/// Write a string object; short payloads go to the in-object buffer like
/// the real SSO layout.
pub fn write_string(img: &mut Image, at: u64, text: &str)
{
    let data = if text.len() < 16 {
        at + 16
    } else {
        img.alloc(text.len() as u64 + 1, 8)
    };
    img.write_str(data, text);
    img.write_u64(at, data);
    img.write_u64(at + 8, text.len() as u64);
}

// ---------------------------------------------------------------------------
// std::mutex

pub fn mutex_() -> TypeRef
{
    let data = TypeDescriptor::structure(
        "__pthread_mutex_s",
        40,
        vec![
            Member::field("__lock", int_(), 0),
            Member::field("__count", uint_(), 4),
            Member::field("__owner", int_(), 8),
        ],
    );
    let native = TypeDescriptor::union(
        "pthread_mutex_t",
        40,
        vec![Member::field("__data", data, 0)],
    );
    TypeDescriptor::structure("std::mutex", 40, vec![Member::field("_M_mutex", native, 0)])
}

pub fn write_mutex(img: &mut Image, at: u64, locked: bool, owner: i32)
{
    img.write_i32(at, locked as i32);
    img.write_i32(at + 8, if locked { owner } else { 0 });
}

// ---------------------------------------------------------------------------
// std::function

pub fn function_() -> TypeRef
{
    let unused = TypeDescriptor::union(
        "std::_Nocopy_types",
        16,
        vec![Member::field("_M_object", void_ptr(), 0)],
    );
    let any_data = TypeDescriptor::structure(
        "std::_Any_data",
        16,
        vec![Member::field("_M_unused", unused, 0)],
    );
    TypeDescriptor::structure(
        "std::function<void ()>",
        32,
        vec![
            Member::field("_M_functor", any_data, 0),
            Member::field("_M_manager", void_ptr(), 16),
            Member::field("_M_invoker", void_ptr(), 24),
        ],
    )
}

// ---------------------------------------------------------------------------
// frame::lf containers

pub fn lf_chunk() -> TypeRef
{
    TypeDescriptor::structure("frame::lf::Chunk", 8, vec![Member::field("chunk", void_ptr(), 0)])
}

pub fn lf_vector_of(elem: &TypeRef, elem_name: &str) -> TypeRef
{
    let vec = TypeDescriptor::structure(
        &format!("frame::lf::Vector<{elem_name}>"),
        8,
        vec![Member::field("chunk", lf_chunk(), 0)],
    );
    vec.set_template_args(vec![elem.clone()]);
    vec
}

/// Write a chunk directory and storage; returns the storage address.
pub fn write_lf_chunk(
    img: &mut Image,
    chunk_field_at: u64,
    used_bytes: u64,
    capacity_bytes: u64,
    collected: bool,
) -> u64
{
    let dir = img.alloc(24, 32);
    let storage = img.alloc(capacity_bytes, 8);
    img.write_u64(dir, storage);
    img.write_u64(dir + 8, storage + capacity_bytes);
    img.write_u64(dir + 16, storage + used_bytes);
    let tagged = dir | u64::from(collected);
    img.write_u64(chunk_field_at, tagged);
    storage
}

pub fn pair_int_int_plain() -> TypeRef
{
    TypeDescriptor::structure(
        "std::pair<int, int>",
        8,
        vec![
            Member::field("first", int_(), 0),
            Member::field("second", int_(), 4),
        ],
    )
}

/// Bucket entry of the lock-free hash maps: `(kv, next, free)`.
pub fn lf_bucket() -> TypeRef
{
    TypeDescriptor::structure(
        "frame::lf::HashMap<int, int>::Bucket",
        24,
        vec![
            Member::field("kv", pair_int_int_plain(), 0),
            Member::field("next", ulong_(), 8),
            Member::field("free", ulong_(), 16),
        ],
    )
}

pub fn lf_hashmap_int_int() -> TypeRef
{
    let bucket = lf_bucket();
    let map = TypeDescriptor::structure(
        "frame::lf::HashMap<int, int>",
        16,
        vec![
            Member::field("size_", ulong_(), 0),
            Member::field("buckets_", lf_vector_of(&bucket, "frame::lf::HashMap<int, int>::Bucket"), 8),
        ],
    );
    map.set_template_args(vec![int_(), int_()]);
    map
}

/// One bucket-store entry: key/value plus the two chain indices.
#[derive(Clone, Copy)]
pub struct LfBucketEntry
{
    pub kv: (i32, i32),
    pub next: u64,
    pub free: u64,
}

/// Write the bucket store of an `lf::HashMap` behind a chunk at
/// `buckets_chunk_at`.
pub fn write_lf_buckets(img: &mut Image, buckets_chunk_at: u64, entries: &[LfBucketEntry])
{
    let bytes = entries.len() as u64 * 24;
    let storage = write_lf_chunk(img, buckets_chunk_at, bytes, bytes, false);
    for (i, entry) in entries.iter().enumerate() {
        let slot = storage + i as u64 * 24;
        img.write_i32(slot, entry.kv.0);
        img.write_i32(slot + 4, entry.kv.1);
        img.write_u64(slot + 8, entry.next);
        img.write_u64(slot + 16, entry.free);
    }
}
