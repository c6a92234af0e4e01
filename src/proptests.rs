use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;

fn validate_tree<V>(t: &PrefixTrie<V>) {
    let root = &t.nodes[NodeId::ROOT];
    assert_eq!(root.prefix, Prefix::default(), "root must cover everything");

    let mut stack: Vec<(NodeId, usize)> = vec![(NodeId::ROOT, 1)];
    let mut reachable = 0usize;
    while let Some((id, depth)) = stack.pop() {
        reachable += 1;
        assert!(depth <= 33, "tree deeper than 33 levels");

        let node = &t.nodes[id];
        let prefix = node.prefix;
        assert_eq!(
            prefix.addr(),
            prefix.addr().masked(prefix.prefix_len()),
            "address of {prefix} is not canonical"
        );
        if id != NodeId::ROOT && node.value.is_none() {
            assert!(
                node.left.is_some() && node.right.is_some(),
                "fork {prefix} must hold two subtrees"
            );
        }

        for (bit, child) in [(true, node.left), (false, node.right)] {
            let Some(child) = child else { continue };
            let child_prefix = t.nodes[child].prefix;
            assert!(
                prefix.prefix_len() < child_prefix.prefix_len(),
                "child {child_prefix} is not more specific than {prefix}"
            );
            assert!(
                prefix.covers(&child_prefix),
                "child {child_prefix} escapes {prefix}"
            );
            assert_eq!(
                node.branch_bit(child_prefix.addr()),
                bit,
                "child {child_prefix} is on the wrong side of {prefix}"
            );
            stack.push((child, depth + 1));
        }
    }

    assert_eq!(reachable, t.node_count(), "every arena node must be reachable");
}

fn addr_strategy() -> impl Strategy<Value = u32> {
    // A narrow pool so that generated prefixes nest, collide, and fork.
    (
        prop::sample::select(vec![0x0Au32, 0x0B, 0x8A, 0xC0]),
        0u32..4,
        0u32..4,
        0u32..8,
    )
        .prop_map(|(a, b, c, d)| a << 24 | b << 16 | c << 8 | d)
}

#[derive(Clone, Debug, Arbitrary)]
struct Registration {
    #[proptest(strategy = "addr_strategy()")]
    addr: u32,
    #[proptest(strategy = "0u8..=32")]
    len: u8,
    /// Index into a small pool of shared handles.
    #[proptest(strategy = "0usize..3")]
    handle: usize,
}

impl Registration {
    fn prefix(&self) -> Prefix {
        Prefix::new(BitAddress::from_bits(self.addr), self.len).unwrap()
    }
}

fn registration_strategy() -> impl Strategy<Value = Vec<Registration>> {
    prop::collection::vec(any::<Registration>(), 0..=200)
}

fn probe_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(addr_strategy(), 1..=64)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_longest_match_distinct_values(regs in registration_strategy(), probes in probe_strategy()) {
        let mut t: PrefixTrie<usize> = PrefixTrie::new(Rc::new(usize::MAX));
        let mut model: Vec<(Prefix, usize)> = Vec::new();

        for (i, reg) in regs.iter().enumerate() {
            let prefix = reg.prefix();
            t.insert_prefix(prefix, Rc::new(i));
            if !model.iter().any(|(p, _)| *p == prefix) {
                model.push((prefix, i));
            }
        }

        validate_tree(&t);
        for probe in probes {
            let addr = BitAddress::from_bits(probe);
            let expected = model
                .iter()
                .filter(|(p, _)| p.contains(addr))
                .max_by_key(|(p, _)| p.prefix_len());
            prop_assert_eq!(
                t.longest_match(addr).map(|(p, v)| (p, **v)),
                expected.copied()
            );
            prop_assert_eq!(*t.lookup_addr(addr), expected.map_or(usize::MAX, |(_, v)| *v));
        }
    }

    // A merge absorbs the narrower same-valued entry, so a later entry of
    // intermediate length may outrank it. The answer still comes from some
    // registration covering the address.
    #[test]
    fn prop_shared_values_resolve_to_a_covering_registration(
        regs in registration_strategy(),
        probes in probe_strategy(),
    ) {
        let handles: Vec<Rc<usize>> = (0..3).map(Rc::new).collect();
        let default = Rc::new(usize::MAX);
        let mut t = PrefixTrie::new(Rc::clone(&default));
        for reg in &regs {
            t.insert_prefix(reg.prefix(), Rc::clone(&handles[reg.handle]));
        }

        validate_tree(&t);
        for probe in probes {
            let addr = BitAddress::from_bits(probe);
            let covering: Vec<&Registration> =
                regs.iter().filter(|r| r.prefix().contains(addr)).collect();
            let got = t.lookup_addr(addr);
            if covering.is_empty() {
                prop_assert!(Rc::ptr_eq(&got, &default));
            } else {
                prop_assert!(
                    covering.iter().any(|r| Rc::ptr_eq(&got, &handles[r.handle])),
                    "{} resolved to a value no covering registration carries",
                    addr
                );
            }
        }
    }

    #[test]
    fn prop_repeated_insert_is_idempotent(regs in registration_strategy()) {
        let handles: Vec<Rc<usize>> = (0..3).map(Rc::new).collect();
        let mut once = PrefixTrie::new(Rc::new(usize::MAX));
        let mut twice = PrefixTrie::new(Rc::new(usize::MAX));

        for reg in &regs {
            let value = &handles[reg.handle];
            once.insert_prefix(reg.prefix(), Rc::clone(value));
            twice.insert_prefix(reg.prefix(), Rc::clone(value));
            twice.insert_prefix(reg.prefix(), Rc::clone(value));
        }

        validate_tree(&twice);
        prop_assert_eq!(once.dump(), twice.dump());
    }

    #[test]
    fn prop_text_round_trip(addr in any::<u32>(), len in 0u8..=32) {
        let addr = BitAddress::from_bits(addr);
        prop_assert_eq!(addr.to_string().parse::<BitAddress>(), Ok(addr));

        let prefix = Prefix::new(addr, len).unwrap();
        prop_assert_eq!(prefix.to_string().parse::<Prefix>(), Ok(prefix));
        prop_assert!(prefix.contains(addr));
    }
}

/// Calls `f` once per ordering of `items`, permuting them in place.
fn each_ordering<T>(items: &mut [T], mut f: impl FnMut(&[T])) {
    // Iterative Heap's algorithm: `swaps[k]` counts swaps done at level `k`.
    let mut swaps = vec![0usize; items.len()];
    f(&*items);
    let mut k = 1;
    while k < items.len() {
        if swaps[k] < k {
            let from = if k % 2 == 0 { 0 } else { swaps[k] };
            items.swap(from, k);
            f(&*items);
            swaps[k] += 1;
            k = 1;
        } else {
            swaps[k] = 0;
            k += 1;
        }
    }
}

#[test]
fn exhaustive_insert_order_scenario() {
    let vt = Rc::new("Viettel");
    let fpt = Rc::new("FPT");
    let mut entries = [
        ("10.42.42.2/32", Rc::clone(&vt)),
        ("10.42.42.1/32", Rc::clone(&vt)),
        ("10.42.42.3/32", Rc::clone(&vt)),
        ("10.42.42.0/16", Rc::clone(&vt)),
        ("10.0.0.0/8", Rc::clone(&fpt)),
        ("10.0.0.0/28", Rc::clone(&fpt)),
    ];

    let mut orderings = 0;
    each_ordering(&mut entries, |order| {
        orderings += 1;
        let t = PrefixTrie::new_from(order.iter().cloned(), Rc::new("QT")).unwrap();
        let order: Vec<&str> = order.iter().map(|(p, _)| *p).collect();
        validate_tree(&t);

        assert_eq!(*t.lookup("10.42.42.5").unwrap(), "Viettel", "{order:?}");
        assert_eq!(*t.lookup("10.42.42.2").unwrap(), "Viettel", "{order:?}");
        assert_eq!(*t.lookup("10.1.2.3").unwrap(), "FPT", "{order:?}");
        assert_eq!(*t.lookup("10.0.0.5").unwrap(), "FPT", "{order:?}");
        assert_eq!(*t.lookup("8.8.8.8").unwrap(), "QT", "{order:?}");
    });
    assert_eq!(orderings, 720);
}
