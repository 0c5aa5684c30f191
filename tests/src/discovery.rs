mod controller;
mod range;
mod switch;
