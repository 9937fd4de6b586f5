// 测试：侵入式空闲页链表
use std::ptr::NonNull;

use super::TestMemory;
use crate::config::{JUNK_ON_FREE, PAGE_SIZE};
use crate::mm::freelist::{fill_page, FreeList};

fn page_ptrs(mem: &TestMemory) -> Vec<NonNull<u8>> {
    (0..mem.pages())
        .map(|i| unsafe { NonNull::new_unchecked(mem.base().as_ptr().add(i * PAGE_SIZE)) })
        .collect()
}

fn freed_list(pages: &[NonNull<u8>]) -> FreeList {
    let mut list = FreeList::new();
    for &page in pages {
        unsafe {
            fill_page(page, JUNK_ON_FREE);
            list.push(page);
        }
    }
    list
}

#[test]
fn push_pop_is_lifo() {
    let mem = TestMemory::new(3);
    let pages = page_ptrs(&mem);
    let mut list = freed_list(&pages);

    assert_eq!(list.len(), 3, "list should hold three pages");
    assert_eq!(list.pop(), Some(pages[2]), "last pushed page should pop first");
    assert_eq!(list.pop(), Some(pages[1]));
    assert_eq!(list.pop(), Some(pages[0]));
    assert_eq!(list.pop(), None, "list should be empty");
    assert!(list.is_empty());
}

#[test]
fn iter_walks_head_to_tail_without_consuming() {
    let mem = TestMemory::new(4);
    let pages = page_ptrs(&mem);
    let list = freed_list(&pages);

    let walked: Vec<_> = list.iter().collect();
    let expected: Vec<_> = pages.iter().rev().copied().collect();
    assert_eq!(walked, expected);
    assert_eq!(list.len(), 4, "iteration must not consume pages");
}

#[test]
fn take_from_moves_at_most_available() {
    let mem = TestMemory::new(5);
    let pages = page_ptrs(&mem);
    let mut src = freed_list(&pages[..3]);
    let mut dst = freed_list(&pages[3..]);

    assert_eq!(dst.take_from(&mut src, 2), 2);
    assert_eq!(src.len(), 1);
    assert_eq!(dst.len(), 4);

    // 源链表只剩一页，请求更多也只能移动一页
    assert_eq!(dst.take_from(&mut src, 10), 1);
    assert!(src.is_empty());
    assert_eq!(dst.len(), 5);

    assert_eq!(dst.take_from(&mut src, 1), 0, "empty source moves nothing");
}

#[test]
fn take_from_relinks_source_heads_onto_destination() {
    let mem = TestMemory::new(4);
    let pages = page_ptrs(&mem);
    let mut src = freed_list(&pages[..3]);
    let mut dst = FreeList::new();

    dst.take_from(&mut src, 2);

    // src 头部依次是 pages[2], pages[1]；逐个压入后 pages[1] 在 dst 头部
    let moved: Vec<_> = dst.iter().collect();
    assert_eq!(moved, vec![pages[1], pages[2]]);
    assert_eq!(src.iter().collect::<Vec<_>>(), vec![pages[0]]);
}

#[test]
fn tail_page_is_entirely_free_poison() {
    let mem = TestMemory::new(2);
    let pages = page_ptrs(&mem);
    let _list = freed_list(&pages);

    // pages[0] 是链尾：链接字编码后也等于毒化值
    let tail = unsafe { std::slice::from_raw_parts(pages[0].as_ptr(), PAGE_SIZE) };
    assert!(tail.iter().all(|&b| b == JUNK_ON_FREE), "tail page should be pure free poison");

    // pages[1] 链接到 pages[0]：只有第一个字不同
    let head = unsafe { std::slice::from_raw_parts(pages[1].as_ptr(), PAGE_SIZE) };
    let word = std::mem::size_of::<usize>();
    assert!(head[word..].iter().all(|&b| b == JUNK_ON_FREE));
    let raw = usize::from_ne_bytes(head[..word].try_into().unwrap());
    assert_ne!(raw, pages[0].as_ptr() as usize, "link must not be stored as a raw pointer");
}
