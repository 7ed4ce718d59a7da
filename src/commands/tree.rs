//! # Tree Command Implementation
//!
//! This module implements the `tree` subcommand, which installs the
//! requested packages and displays their dependency graph as a tree.
//!
//! A package reachable through several paths is printed under each of them;
//! a dependency that leads back to a package already on the current path is
//! marked as a cycle and not expanded.

use std::collections::HashSet;

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};

use repo_packages::package::PackageId;
use repo_packages::system::RepositorySystem;

use super::{resolve, SystemArgs};

/// Display the package dependency tree
#[derive(Args, Debug)]
pub struct TreeArgs {
    #[command(flatten)]
    pub system: SystemArgs,

    /// Maximum depth to display in the tree.
    ///
    /// If not specified, displays the full tree.
    /// Use 0 to show only the requested packages, 1 to show their direct
    /// dependencies, etc.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,
}

/// Execute the `tree` command.
pub fn execute(args: TreeArgs) -> Result<()> {
    let resolved = resolve(&args.system)?;
    let max_depth = args.depth.unwrap_or(usize::MAX);

    let root = TreeNode {
        label: resolved.system.package_root().display().to_string(),
        children: resolved
            .root_ids()
            .into_iter()
            .map(|id| build_tree_node(&resolved.system, id, max_depth, 0, &mut HashSet::new()))
            .collect(),
    };
    print_tree(&root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

fn build_tree_node(
    system: &RepositorySystem,
    id: PackageId,
    max_depth: usize,
    current_depth: usize,
    path: &mut HashSet<PackageId>,
) -> TreeNode {
    let Some(package) = system.package(id) else {
        return TreeNode::leaf(format!("{:?}", id));
    };
    let status = match package.current_source() {
        Some(source) => source.url.clone(),
        None if package.is_installed() => "installed".to_string(),
        None => "not installed".to_string(),
    };
    let label = format!("{} ({})", package.name(), status);

    if !path.insert(id) {
        return TreeNode::leaf(format!("{} (cycle)", package.name()));
    }
    let children = if current_depth >= max_depth {
        Vec::new()
    } else {
        package
            .dependencies()
            .iter()
            .map(|dependency| {
                build_tree_node(system, *dependency, max_depth, current_depth + 1, path)
            })
            .collect()
    };
    path.remove(&id);

    TreeNode { label, children }
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(label: String) -> Self {
        Self {
            label,
            children: Vec::new(),
        }
    }
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<'_, [Self::Child]> {
        std::borrow::Cow::Borrowed(&self.children)
    }
}
