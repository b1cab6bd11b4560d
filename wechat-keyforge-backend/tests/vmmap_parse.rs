use wechat_keyforge_backend::vmmap::parse_writable_regions;

const MULTI_PROCESS_OUTPUT: &str = "\
Process:         WeChat [4242]
Path:             /Applications/WeChat.app/Contents/MacOS/WeChat

==== Writable regions for process 4242
MALLOC_NANO     120000000-120800000 [ 8192K 4096K 4096K     0K] rw-/rwx SM=PRV
MALLOC_TINY     120800000-120810000 [   64K   32K   32K     0K] rw-/rwx SM=PRV
MALLOC_NANO     1f0000000-1f0010000 [   64K   16K   16K     0K] rw-/rwx SM=PRV
MALLOC_NANO     200000000-204000000 [65536K 8192K 8192K     0K] rw-/rwx SM=PRV
MALLOC_SMALL    300000000-304000000 [65536K 8192K 8192K     0K] rw-/rwx SM=PRV

==== Non-writable regions for process 4242
__TEXT          100000000-100100000 [ 1024K    0K    0K     0K] r-x/r-x SM=COW
";

#[test]
fn recovers_only_heap_arenas_above_floor() {
    let regions = parse_writable_regions(MULTI_PROCESS_OUTPUT, 1024 * 1024);
    assert_eq!(regions.len(), 2);
    assert!(regions.iter().any(|r| r.base == 0x120000000 && r.size == 0x800000));
    assert!(regions.iter().any(|r| r.base == 0x200000000 && r.size == 0x4000000));
}

#[test]
fn excludes_malloc_small_arena_regardless_of_size() {
    let regions = parse_writable_regions(MULTI_PROCESS_OUTPUT, 0);
    assert!(regions.iter().all(|r| r.base != 0x300000000));
}

#[test]
fn zero_floor_still_excludes_small_tiny_arena() {
    let regions = parse_writable_regions(MULTI_PROCESS_OUTPUT, 0);
    assert!(regions.iter().all(|r| r.base != 0x120800000));
}

#[test]
fn stops_at_non_writable_section() {
    let regions = parse_writable_regions(MULTI_PROCESS_OUTPUT, 0);
    assert!(regions.iter().all(|r| r.base != 0x100000000));
}

#[test]
fn empty_output_yields_no_regions() {
    assert!(parse_writable_regions("", 0).is_empty());
}
