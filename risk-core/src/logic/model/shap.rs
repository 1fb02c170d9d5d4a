//! TreeSHAP
//!
//! Exact path-dependent SHAP values for a single tree (Lundberg et al.,
//! "Consistent Individualized Feature Attribution for Tree Ensembles").
//! Node covers supply the conditional expectations.

use super::booster::Tree;

#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` for the root sentinel
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Add the SHAP values of `tree` for sample `x` into `phi`
pub(crate) fn tree_shap(tree: &Tree, x: &[f32], phi: &mut [f64]) {
    recurse(tree, x, phi, 0, Vec::new(), 1.0, 1.0, None);
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    x: &[f32],
    phi: &mut [f64],
    node_idx: usize,
    mut path: Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    extend_path(&mut path, zero_fraction, one_fraction, feature);
    let node = &tree.nodes[node_idx];

    if node.is_leaf() {
        let depth = path.len() - 1;
        for i in 1..=depth {
            let w = unwound_path_sum(&path, i);
            let el = path[i];
            if let Some(f) = el.feature {
                if let Some(slot) = phi.get_mut(f) {
                    *slot += w * (el.one_fraction - el.zero_fraction) * node.value as f64;
                }
            }
        }
        return;
    }

    let (Some(left), Some(right)) = (node.left, node.right) else {
        return;
    };
    let hot = tree.next(node_idx, x);
    let cold = if hot == left { right } else { left };

    let cover = node.cover;
    let (hot_zero, cold_zero) = if cover > 0.0 {
        (tree.nodes[hot].cover / cover, tree.nodes[cold].cover / cover)
    } else {
        (0.0, 0.0)
    };

    let mut incoming_zero = 1.0;
    let mut incoming_one = 1.0;

    // A feature split on twice along the path is collapsed into one element
    if let Some(k) = path.iter().position(|e| e.feature == Some(node.feature)) {
        incoming_zero = path[k].zero_fraction;
        incoming_one = path[k].one_fraction;
        unwind_path(&mut path, k);
    }

    recurse(
        tree,
        x,
        phi,
        hot,
        path.clone(),
        hot_zero * incoming_zero,
        incoming_one,
        Some(node.feature),
    );
    recurse(
        tree,
        x,
        phi,
        cold,
        path,
        cold_zero * incoming_zero,
        0.0,
        Some(node.feature),
    );
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / denom;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / denom;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;
    let denom = (depth + 1) as f64;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (depth - i) as f64 / denom;
        } else if zero_fraction != 0.0 {
            path[i].pweight = path[i].pweight * denom / (zero_fraction * (depth - i) as f64);
        }
    }

    // pweights stay in place; only the identities shift down
    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;
    let denom = (depth + 1) as f64;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * (depth - i) as f64 / denom;
        } else if zero_fraction != 0.0 {
            total += (path[i].pweight / zero_fraction) / ((depth - i) as f64 / denom);
        }
    }
    total
}
