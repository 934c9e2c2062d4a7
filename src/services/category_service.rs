use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::{
    dto::categories::CategoryRequest,
    entity::{
        categories::{
            ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories,
            Model as CategoryModel,
        },
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    models::Category,
    state::AppState,
};

/// Flat id-indexed view of the category hierarchy.
///
/// Children are looked up through an index keyed by parent id rather than
/// stored on the nodes, and every walk keeps a visited set so a corrupted
/// parent chain cannot loop forever.
pub struct CategoryTree {
    nodes: HashMap<Uuid, CategoryModel>,
    children: HashMap<Uuid, Vec<Uuid>>,
}

impl CategoryTree {
    pub fn new(models: Vec<CategoryModel>) -> Self {
        let nodes: HashMap<Uuid, CategoryModel> = models.into_iter().map(|m| (m.id, m)).collect();

        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for node in nodes.values() {
            if let Some(parent_id) = node.parent_id {
                children.entry(parent_id).or_default().push(node.id);
            }
        }
        for ids in children.values_mut() {
            ids.sort_by(|a, b| {
                let (a, b) = (&nodes[a], &nodes[b]);
                (a.display_order, &a.name).cmp(&(b.display_order, &b.name))
            });
        }

        Self { nodes, children }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Top-level categories: those whose parent is absent from the tree.
    pub fn roots(&self) -> Vec<Category> {
        let mut roots: Vec<&CategoryModel> = self
            .nodes
            .values()
            .filter(|n| n.parent_id.is_none_or(|p| !self.nodes.contains_key(&p)))
            .collect();
        roots.sort_by(|a, b| (a.display_order, &a.name).cmp(&(b.display_order, &b.name)));
        roots
            .into_iter()
            .filter_map(|n| self.subtree(n.id))
            .collect()
    }

    /// The category with its children nested beneath it.
    pub fn subtree(&self, id: Uuid) -> Option<Category> {
        let mut visited = HashSet::new();
        self.build(id, &mut visited)
    }

    fn build(&self, id: Uuid, visited: &mut HashSet<Uuid>) -> Option<Category> {
        if !visited.insert(id) {
            return None;
        }
        let mut category = Category::leaf(self.nodes.get(&id)?.clone());
        category.children = self
            .children
            .get(&id)
            .map(|ids| ids.iter().filter_map(|c| self.build(*c, visited)).collect())
            .unwrap_or_default();
        Some(category)
    }

    /// `id` followed by every category below it.
    pub fn descendants(&self, id: Uuid) -> Vec<Uuid> {
        let mut visited = HashSet::new();
        let mut stack = vec![id];
        let mut out = Vec::new();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            out.push(current);
            if let Some(ids) = self.children.get(&current) {
                stack.extend(ids.iter().rev().copied());
            }
        }
        out
    }

    /// Whether re-parenting `id` under `new_parent` would close a loop.
    pub fn creates_cycle(&self, id: Uuid, new_parent: Uuid) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(new_parent);
        while let Some(node) = current {
            if node == id {
                return true;
            }
            if !visited.insert(node) {
                return true;
            }
            current = self.nodes.get(&node).and_then(|n| n.parent_id);
        }
        false
    }
}

pub(crate) async fn load_tree<C: ConnectionTrait>(conn: &C) -> AppResult<CategoryTree> {
    let models = Categories::find().all(conn).await?;
    Ok(CategoryTree::new(models))
}

pub async fn list_active_categories(state: &AppState) -> AppResult<Vec<Category>> {
    let models = Categories::find()
        .filter(CategoryCol::IsActive.eq(true))
        .all(&state.orm)
        .await?;
    Ok(CategoryTree::new(models).roots())
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<Category> {
    load_tree(&state.orm)
        .await?
        .subtree(id)
        .ok_or_else(|| AppError::not_found("Category", id))
}

pub async fn create_category(state: &AppState, payload: CategoryRequest) -> AppResult<Category> {
    if let Some(parent_id) = payload.parent_id {
        ensure_parent_exists(&state.orm, parent_id).await?;
    }

    let now = Utc::now();
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        parent_id: Set(payload.parent_id),
        image_url: Set(payload.image_url),
        display_order: Set(payload.display_order.unwrap_or(0)),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(category_id = %category.id, name = %category.name, "category created");
    Ok(Category::leaf(category))
}

pub async fn update_category(
    state: &AppState,
    id: Uuid,
    payload: CategoryRequest,
) -> AppResult<Category> {
    let tree = load_tree(&state.orm).await?;
    let existing = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Category", id))?;

    if let Some(parent_id) = payload.parent_id {
        ensure_parent_exists(&state.orm, parent_id).await?;
        if tree.creates_cycle(id, parent_id) {
            return Err(AppError::BadRequest(
                "Category hierarchy cannot contain cycles".into(),
            ));
        }
    }

    let mut active: CategoryActive = existing.into();
    active.name = Set(payload.name);
    active.description = Set(payload.description);
    active.image_url = Set(payload.image_url);
    if let Some(display_order) = payload.display_order {
        active.display_order = Set(display_order);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if payload.parent_id.is_some() {
        active.parent_id = Set(payload.parent_id);
    }
    active.updated_at = Set(Utc::now().into());
    let category = active.update(&state.orm).await?;

    tracing::info!(category_id = %category.id, name = %category.name, "category updated");
    load_tree(&state.orm)
        .await?
        .subtree(category.id)
        .ok_or_else(|| AppError::not_found("Category", id))
}

pub async fn delete_category(state: &AppState, id: Uuid) -> AppResult<()> {
    let category = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Category", id))?;

    let children = Categories::find()
        .filter(CategoryCol::ParentId.eq(id))
        .count(&state.orm)
        .await?;
    if children > 0 {
        return Err(AppError::BadRequest(
            "Category still has child categories".into(),
        ));
    }
    let products = Products::find()
        .filter(ProdCol::CategoryId.eq(id))
        .count(&state.orm)
        .await?;
    if products > 0 {
        return Err(AppError::BadRequest("Category still has products".into()));
    }

    Categories::delete_by_id(id).exec(&state.orm).await?;
    tracing::info!(category_id = %id, name = %category.name, "category deleted");
    Ok(())
}

async fn ensure_parent_exists<C: ConnectionTrait>(conn: &C, parent_id: Uuid) -> AppResult<()> {
    Categories::find_by_id(parent_id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("Parent Category", parent_id))
}
