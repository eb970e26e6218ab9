use crate::jar::{Generation, Mint};

#[test]
fn test_gauge_then_free_list() {
    let mut mint = Mint::<u32>::default();

    let issued: Vec<_> = (0..4).map(|_| mint.next_cookie().expect("not exhausted")).collect();
    let indices: Vec<_> = issued.iter().map(|cookie| cookie.index()).collect();
    assert_eq!(indices, vec![0, 1, 2, 3], "fresh cookies come from the gauge in order");
    assert!(issued.iter().all(|cookie| cookie.generation() == Generation::FIRST));

    mint.return_cookie(issued[1]).expect("cookie is current");
    mint.return_cookie(issued[3]).expect("cookie is current");
    assert_eq!(mint.recyclable(), 2);
    assert_eq!(mint.outstanding(), 2);

    let reissued = mint.next_cookie().expect("not exhausted");
    assert_eq!(reissued.index(), 3, "the free list is LIFO");
    assert_eq!(reissued.generation(), Generation::FIRST.next());
    assert!(!mint.is_current(issued[3]));
    assert!(mint.is_current(reissued));

    let reissued = mint.next_cookie().expect("not exhausted");
    assert_eq!(reissued.index(), 1);

    let fresh = mint.next_cookie().expect("not exhausted");
    assert_eq!(fresh.index(), 4, "the gauge resumes once the free list is empty");
    assert_eq!(mint.issued(), 5);
}
