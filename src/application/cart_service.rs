use uuid::Uuid;

use crate::domain::cart::{AddItemInput, CartView, MAX_LINE_QUANTITY};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;

pub struct CartService<R> {
    repo: R,
}

fn check_quantity(quantity: i32) -> Result<(), DomainError> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(DomainError::InvalidInput(format!(
            "quantity must be between 1 and {}",
            MAX_LINE_QUANTITY
        )));
    }
    Ok(())
}

impl<R: CartRepository> CartService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn get_cart(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        self.repo.get_or_create(user_id)
    }

    pub fn add_item(&self, user_id: Uuid, input: AddItemInput) -> Result<CartView, DomainError> {
        check_quantity(input.quantity)?;
        self.repo.add_item(user_id, input)
    }

    pub fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        check_quantity(quantity)?;
        self.repo.update_item(user_id, item_id, quantity)
    }

    pub fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError> {
        self.repo.remove_item(user_id, item_id)
    }

    pub fn clear(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        self.repo.clear(user_id)
    }

    pub fn apply_coupon(&self, user_id: Uuid, code: &str) -> Result<CartView, DomainError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(DomainError::InvalidInput("coupon code is required".to_string()));
        }
        self.repo.apply_coupon(user_id, code)
    }
}
